// ==========================================
// 航空主运单草稿 - 配置层
// ==========================================
// 职责: 计算参数、缓存参数、规模上限
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, DraftLimits};
