// ==========================================
// 航空主运单草稿 - 访问策略
// ==========================================
// 职责: 按操作名控制服务方法的访问
// 说明: API 层只定义 trait; 策略实现返回的错误由服务原样向上传递
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

// ==========================================
// 受控操作
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Get,
    CreateOrUpdate,
    Submit,
    Confirm,
    Reject,
    Delete,
    GenerateDocument,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::Get,
        Operation::CreateOrUpdate,
        Operation::Submit,
        Operation::Confirm,
        Operation::Reject,
        Operation::Delete,
        Operation::GenerateDocument,
    ];

    /// 操作名（策略配置使用）
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Get => "draft_mawb.get",
            Operation::CreateOrUpdate => "draft_mawb.create_or_update",
            Operation::Submit => "draft_mawb.submit",
            Operation::Confirm => "draft_mawb.confirm",
            Operation::Reject => "draft_mawb.reject",
            Operation::Delete => "draft_mawb.delete",
            Operation::GenerateDocument => "draft_mawb.generate_document",
        }
    }
}

/// 授权失败
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("无权执行操作 {operation}: {reason}")]
    Forbidden { operation: String, reason: String },

    #[error("未认证的调用方")]
    Unauthenticated,
}

/// 访问策略 Trait
///
/// 由宿主应用实现（角色表、令牌校验等）
pub trait AccessPolicy: Send + Sync {
    fn authorize(&self, operation: Operation) -> Result<(), PolicyError>;
}

/// 放行全部操作（未启用访问控制时使用）
#[derive(Debug, Clone, Default)]
pub struct AllowAllPolicy;

impl AccessPolicy for AllowAllPolicy {
    fn authorize(&self, operation: Operation) -> Result<(), PolicyError> {
        tracing::trace!(operation = operation.as_str(), "AllowAllPolicy: 放行");
        Ok(())
    }
}

/// 按操作白名单放行
#[derive(Debug, Clone)]
pub struct OperationAllowList {
    role: String,
    allowed: HashSet<Operation>,
}

impl OperationAllowList {
    pub fn new(role: impl Into<String>, allowed: impl IntoIterator<Item = Operation>) -> Self {
        Self {
            role: role.into(),
            allowed: allowed.into_iter().collect(),
        }
    }

    /// 只读角色: 查询与生成文档
    pub fn read_only(role: impl Into<String>) -> Self {
        Self::new(role, [Operation::Get, Operation::GenerateDocument])
    }
}

impl AccessPolicy for OperationAllowList {
    fn authorize(&self, operation: Operation) -> Result<(), PolicyError> {
        if self.allowed.contains(&operation) {
            Ok(())
        } else {
            Err(PolicyError::Forbidden {
                operation: operation.as_str().to_string(),
                reason: format!("角色 {} 未被授权", self.role),
            })
        }
    }
}
