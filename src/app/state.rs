// ==========================================
// 航空主运单草稿 - 应用状态
// ==========================================
// 职责: 打开数据库、读取配置、装配 API 与后台缓存清扫
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::DraftMawbApi;
use crate::cache::CacheSweeper;
use crate::config::config_manager::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::CalculationEngine;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "DRAFT_MAWB_DB_PATH";

/// 应用状态
///
/// 包含 API 实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 草稿聚合API
    pub draft_mawb_api: Arc<DraftMawbApi>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    // Drop 时停止清扫线程
    sweeper: Option<CacheSweeper>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并建表（幂等）
    /// 2. 从 config_kv 读取计算参数与规模上限
    /// 3. 创建计算引擎与 API
    /// 4. 启动缓存清扫线程
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // 配置管理器
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let calc_config = config_manager
            .calculation_config()
            .map_err(|e| format!("读取计算参数失败: {}", e))?;
        let limits = config_manager
            .draft_limits()
            .map_err(|e| format!("读取规模上限失败: {}", e))?;
        let sweep_interval = config_manager
            .cache_sweep_interval()
            .map_err(|e| format!("读取清扫周期失败: {}", e))?;

        // 计算引擎与 API
        let engine = Arc::new(CalculationEngine::new(calc_config));
        let draft_mawb_api = Arc::new(DraftMawbApi::new(conn, engine).with_limits(limits));

        // 后台清扫失败不阻塞启动,过期条目仍会在读取时被忽略
        let sweeper = match CacheSweeper::spawn(draft_mawb_api.sweepable_caches(), sweep_interval) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!("缓存清扫线程启动失败(将继续启动): {}", e);
                None
            }
        };

        tracing::info!(
            volumetric_factor = calc_config.volumetric_factor,
            max_items = limits.max_items,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            draft_mawb_api,
            config_manager,
            sweeper,
        })
    }

    /// 后台清扫线程是否在运行
    pub fn sweeper_running(&self) -> bool {
        self.sweeper.is_some()
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 DRAFT_MAWB_DB_PATH → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./draft_mawb.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        let dir = data_dir.join("draft-mawb-dev");

        #[cfg(not(debug_assertions))]
        let dir = data_dir.join("draft-mawb");

        // 目录创建失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("draft_mawb.db");
        }
    }

    path.to_string_lossy().to_string()
}
