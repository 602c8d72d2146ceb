// ==========================================
// 航空主运单草稿 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换下层错误为用户可读的错误消息
// 说明: 错误种类 (ErrorKind) 在包装后仍可识别
// ==========================================

use crate::api::policy::PolicyError;
use crate::db::DeadlineExceeded;
use crate::engine::error::CalcError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 记录存在性
    // ==========================================
    #[error("草稿不存在: mawb_info_id={parent_id}")]
    DraftNotFound { parent_id: String },

    #[error("主运单信息不存在: mawb_info_id={parent_id}")]
    ParentNotFound { parent_id: String },

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效的状态值: {0}")]
    InvalidStatus(String),

    #[error("无效的计量值 (field={path}): {message}")]
    InvalidMeasurement { path: String, message: String },

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    /// 请求校验失败（带全部字段错误）
    #[error("请求校验失败: {reason}")]
    ValidationFailed {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    #[error("无效输入: {0}")]
    InvalidInput(String),

    // ==========================================
    // 外部协作方错误
    // ==========================================
    #[error("文档生成失败: {0}")]
    RenderingFailed(String),

    #[error("访问被拒绝: {0}")]
    AccessDenied(PolicyError),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("存储失败: {0}")]
    StorageFailed(String),

    #[error("无记录受影响: {0}")]
    NoRowsAffected(String),

    #[error("操作超时: stage={stage}")]
    DeadlineExceeded { stage: String },

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// ErrorKind - 稳定的错误种类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    ParentNotFound,
    InvalidStatus,
    InvalidMeasurement,
    BusinessRuleViolation,
    ValidationFailed,
    InvalidInput,
    RenderingFailed,
    AccessDenied,
    StorageFailed,
    DeadlineExceeded,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::ParentNotFound => "PARENT_NOT_FOUND",
            ErrorKind::InvalidStatus => "INVALID_STATUS",
            ErrorKind::InvalidMeasurement => "INVALID_MEASUREMENT",
            ErrorKind::BusinessRuleViolation => "BUSINESS_RULE_VIOLATION",
            ErrorKind::ValidationFailed => "VALIDATION_FAILED",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::RenderingFailed => "RENDERING_FAILED",
            ErrorKind::AccessDenied => "ACCESS_DENIED",
            ErrorKind::StorageFailed => "STORAGE_FAILED",
            ErrorKind::DeadlineExceeded => "DEADLINE_EXCEEDED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ApiError {
    /// 错误种类
    ///
    /// `Other` 包装的错误会沿 anyhow 错误链查找内层 ApiError
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::DraftNotFound { .. } | ApiError::NoRowsAffected(_) => ErrorKind::NotFound,
            ApiError::ParentNotFound { .. } => ErrorKind::ParentNotFound,
            ApiError::InvalidStatus(_) => ErrorKind::InvalidStatus,
            ApiError::InvalidMeasurement { .. } => ErrorKind::InvalidMeasurement,
            ApiError::BusinessRuleViolation(_) => ErrorKind::BusinessRuleViolation,
            ApiError::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            ApiError::InvalidInput(_) => ErrorKind::InvalidInput,
            ApiError::RenderingFailed(_) => ErrorKind::RenderingFailed,
            ApiError::AccessDenied(_) => ErrorKind::AccessDenied,
            ApiError::StorageFailed(_) => ErrorKind::StorageFailed,
            ApiError::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            ApiError::InternalError(_) => ErrorKind::Internal,
            ApiError::Other(err) => match err.downcast_ref::<ApiError>() {
                Some(inner) => inner.kind(),
                None => ErrorKind::Internal,
            },
        }
    }

    /// 细分错误码（比 kind 更细,如 DRAFT_NOT_FOUND / NO_ROWS_AFFECTED）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::DraftNotFound { .. } => "DRAFT_NOT_FOUND",
            ApiError::NoRowsAffected(_) => "NO_ROWS_AFFECTED",
            ApiError::Other(err) => match err.downcast_ref::<ApiError>() {
                Some(inner) => inner.code(),
                None => ErrorKind::Internal.as_str(),
            },
            other => other.kind().as_str(),
        }
    }

    /// 草稿或父文档不存在（与 RepositoryError::is_not_found 口径一致）
    ///
    /// 需要区分两者时使用 kind()
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::ParentNotFound)
    }

    /// 附加上下文,错误种类保持不变
    pub fn context<C>(self, context: C) -> ApiError
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        ApiError::Other(anyhow::Error::new(self).context(context))
    }

    /// 访问策略原始错误（仅 AccessDenied）
    pub fn policy_error(&self) -> Option<&PolicyError> {
        match self {
            ApiError::AccessDenied(e) => Some(e),
            ApiError::Other(err) => err.downcast_ref::<ApiError>().and_then(|e| e.policy_error()),
            _ => None,
        }
    }

    /// 字段级校验错误列表
    pub fn violations(&self) -> &[ValidationViolation] {
        match self {
            ApiError::ValidationFailed { violations, .. } => violations,
            _ => &[],
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// 说明: “无记录受影响”与真正的存储故障分开
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NoRowsAffected(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::ParentNotFound { parent_id } => ApiError::ParentNotFound { parent_id },
            RepositoryError::InvalidStatus(s) => ApiError::InvalidStatus(s),
            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::DeadlineExceeded { stage } => ApiError::DeadlineExceeded { stage },

            // 数据库错误
            RepositoryError::DatabaseConnectionError(msg) => {
                ApiError::StorageFailed(format!("数据库连接失败: {}", msg))
            }
            RepositoryError::LockError(msg) => {
                ApiError::StorageFailed(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::StorageFailed(format!("数据库事务失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => {
                ApiError::StorageFailed(format!("数据库查询失败: {}", msg))
            }
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::StorageFailed(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::StorageFailed(format!("外键约束违反: {}", msg))
            }
            RepositoryError::CheckConstraintViolation(msg) => {
                ApiError::StorageFailed(format!("检查约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::StorageFailed(format!("字段{}错误: {}", field, message))
            }

            // 通用错误
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        match err {
            CalcError::InvalidMeasurement { path, message } => {
                ApiError::InvalidMeasurement { path, message }
            }
        }
    }
}

impl From<DeadlineExceeded> for ApiError {
    fn from(err: DeadlineExceeded) -> Self {
        ApiError::DeadlineExceeded { stage: err.stage }
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        ApiError::AccessDenied(err)
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================

/// 字段级校验错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// 字段路径（如 items[0].dimensions[1].length）
    pub field: String,
    /// 违规原因
    pub message: String,
}

impl ValidationViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
