// ==========================================
// 航空主运单草稿 (Draft MAWB) - 核心库
// ==========================================
// 技术栈: Rust + SQLite (rusqlite)
// 系统定位: 运单草稿编制 - 计费计算 + 聚合事务持久化
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 记忆化缓存
pub mod cache;

// 领域层 - 聚合与类型
pub mod domain;

// 引擎层 - 计费计算
pub mod engine;

// 数据仓储层 - 数据访问
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/截止时间）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ChargeKey, DraftMawbStatus, WeightUnit};

// 领域实体
pub use domain::{DraftMawb, DraftMawbCharge, DraftMawbDimension, DraftMawbItem, MawbInfo};

// 引擎
pub use engine::{CalcError, CalculationConfig, CalculationEngine};

// 仓储
pub use repository::{DraftMawbRepository, MawbInfoRepository, RepositoryError};

// API
pub use api::{ApiError, DraftMawbApi, ErrorKind};

// 截止时间
pub use db::Deadline;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "航空主运单草稿";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";
