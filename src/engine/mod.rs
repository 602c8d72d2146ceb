// ==========================================
// 航空主运单草稿 - 计算引擎层
// ==========================================
// 职责: 由尺寸/毛重/运价/费用推导派生字段
// 红线: Engine 不拼 SQL; 解析失败必须带字段路径
// ==========================================

pub mod calculator;
pub mod error;
pub mod measurement;

// 重导出核心引擎
pub use calculator::{CalculationCacheStats, CalculationConfig, CalculationEngine};
pub use error::{CalcError, CalcResult};
