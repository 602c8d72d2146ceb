// ==========================================
// 航空主运单草稿 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::cache::CacheConfig;
use crate::db::open_sqlite_connection;
use crate::engine::calculator::{
    CalculationConfig, DEFAULT_LB_TO_KG, DEFAULT_VOLUME_DIVISOR, DEFAULT_VOLUMETRIC_FACTOR,
};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// DraftLimits - 聚合规模上限
// ==========================================
// 超出上限视为业务规则违反
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLimits {
    pub max_items: usize,
    pub max_charges: usize,
    pub max_dimensions_per_item: usize,
}

impl Default for DraftLimits {
    fn default() -> Self {
        Self {
            max_items: 50,
            max_charges: 20,
            max_dimensions_per_item: 50,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }


    /// 读取并解析配置值; 缺失或格式错误时使用默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        match self.get_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key, value = %raw, default = %default, "配置值格式错误,使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    /// 写入配置（UPSERT）
    pub fn update_config(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 计算参数 =====

    /// 计算引擎参数（含记忆化缓存参数）
    pub fn calculation_config(&self) -> Result<CalculationConfig, Box<dyn Error>> {
        let volumetric_factor =
            self.get_parsed_or_default(config_keys::CALC_VOLUMETRIC_FACTOR, DEFAULT_VOLUMETRIC_FACTOR)?;
        let lb_to_kg = self.get_parsed_or_default(config_keys::CALC_LB_TO_KG, DEFAULT_LB_TO_KG)?;
        let volume_divisor =
            self.get_parsed_or_default(config_keys::CALC_VOLUME_DIVISOR, DEFAULT_VOLUME_DIVISOR)?;

        Ok(CalculationConfig {
            volumetric_factor,
            lb_to_kg,
            volume_divisor,
            cache: self.cache_config()?,
        })
    }

    /// 记忆化缓存参数
    pub fn cache_config(&self) -> Result<CacheConfig, Box<dyn Error>> {
        let defaults = CacheConfig::default();
        let ttl_secs = self.get_parsed_or_default(config_keys::CACHE_TTL_SECS, defaults.ttl.as_secs())?;
        let max_entries =
            self.get_parsed_or_default(config_keys::CACHE_MAX_ENTRIES, defaults.max_entries)?;

        Ok(CacheConfig {
            ttl: Duration::from_secs(ttl_secs),
            max_entries,
        })
    }

    /// 后台清扫周期
    pub fn cache_sweep_interval(&self) -> Result<Duration, Box<dyn Error>> {
        let secs = self.get_parsed_or_default(config_keys::CACHE_SWEEP_INTERVAL_SECS, 60u64)?;
        Ok(Duration::from_secs(secs.max(1)))
    }

    // ===== 规模上限 =====

    pub fn draft_limits(&self) -> Result<DraftLimits, Box<dyn Error>> {
        let defaults = DraftLimits::default();
        Ok(DraftLimits {
            max_items: self.get_parsed_or_default(config_keys::DRAFT_MAX_ITEMS, defaults.max_items)?,
            max_charges: self
                .get_parsed_or_default(config_keys::DRAFT_MAX_CHARGES, defaults.max_charges)?,
            max_dimensions_per_item: self.get_parsed_or_default(
                config_keys::DRAFT_MAX_DIMENSIONS_PER_ITEM,
                defaults.max_dimensions_per_item,
            )?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 计算参数
    pub const CALC_VOLUMETRIC_FACTOR: &str = "calc_volumetric_factor";
    pub const CALC_LB_TO_KG: &str = "calc_lb_to_kg";
    pub const CALC_VOLUME_DIVISOR: &str = "calc_volume_divisor";

    // 记忆化缓存
    pub const CACHE_TTL_SECS: &str = "cache_ttl_secs";
    pub const CACHE_MAX_ENTRIES: &str = "cache_max_entries";
    pub const CACHE_SWEEP_INTERVAL_SECS: &str = "cache_sweep_interval_secs";

    // 聚合规模上限
    pub const DRAFT_MAX_ITEMS: &str = "draft_max_items";
    pub const DRAFT_MAX_CHARGES: &str = "draft_max_charges";
    pub const DRAFT_MAX_DIMENSIONS_PER_ITEM: &str = "draft_max_dimensions_per_item";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ensure_schema, open_in_memory_connection};

    fn manager() -> ConfigManager {
        let conn = open_in_memory_connection().unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_without_rows() {
        let cm = manager();
        let calc = cm.calculation_config().unwrap();
        assert_eq!(calc, CalculationConfig::default());
        assert_eq!(cm.draft_limits().unwrap(), DraftLimits::default());
        assert_eq!(cm.cache_sweep_interval().unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_update_and_snapshot() {
        let cm = manager();
        cm.update_config(config_keys::DRAFT_MAX_ITEMS, "3").unwrap();
        cm.update_config(config_keys::CALC_VOLUMETRIC_FACTOR, "200").unwrap();
        cm.update_config(config_keys::DRAFT_MAX_ITEMS, "5").unwrap();

        assert_eq!(cm.draft_limits().unwrap().max_items, 5);
        assert_eq!(cm.calculation_config().unwrap().volumetric_factor, 200.0);

        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&cm.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("draft_max_items").map(String::as_str), Some("5"));
    }

    #[test]
    fn test_malformed_value_falls_back_to_default() {
        let cm = manager();
        cm.update_config(config_keys::CACHE_TTL_SECS, "ten minutes").unwrap();
        assert_eq!(cm.cache_config().unwrap().ttl, CacheConfig::default().ttl);
    }
}
