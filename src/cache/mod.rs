// ==========================================
// 航空主运单草稿 - 缓存层
// ==========================================
// 职责: 纯计算结果记忆化、参考数据缓存
// ==========================================

pub mod sweeper;
pub mod ttl_cache;

pub use sweeper::{CacheSweeper, Sweepable};
pub use ttl_cache::{CacheConfig, CacheStatsSnapshot, TtlCache};
