// ==========================================
// 航空主运单草稿 - 领域模型层
// ==========================================
// 职责: 定义聚合、实体与类型
// 红线: 不含数据访问逻辑,不含计算逻辑
// ==========================================

pub mod draft_mawb;
pub mod mawb_info;
pub mod types;

// 重导出核心类型
pub use draft_mawb::{DraftMawb, DraftMawbCharge, DraftMawbDimension, DraftMawbItem};
pub use mawb_info::MawbInfo;
pub use types::{ChargeKey, DraftMawbStatus, WeightUnit};
