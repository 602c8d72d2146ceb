// ==========================================
// 航空主运单草稿 - 数据仓储层
// ==========================================
// 红线: Repository 不含计算逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod draft_mawb_repo;
pub mod error;
pub mod mawb_info_repo;

// 重导出核心仓储
pub use draft_mawb_repo::DraftMawbRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use mawb_info_repo::MawbInfoRepository;
