// ==========================================
// 航空主运单草稿 - 应用层
// ==========================================
// 职责: 装配数据库、配置、计算引擎与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState, DB_PATH_ENV};
