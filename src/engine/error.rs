// ==========================================
// 航空主运单草稿 - 计算引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 解析失败必须带字段路径,不得用默认值顶替
// ==========================================

use thiserror::Error;

/// 计算引擎错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("无效的计量值 (field={path}): {message}")]
    InvalidMeasurement { path: String, message: String },
}

impl CalcError {
    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        CalcError::InvalidMeasurement {
            path: path.into(),
            message: message.into(),
        }
    }

    /// 出错字段的逻辑路径（如 items[1].dimensions[0].length）
    pub fn path(&self) -> &str {
        match self {
            CalcError::InvalidMeasurement { path, .. } => path,
        }
    }

    /// 为字段路径加上外层前缀
    pub fn within(self, prefix: &str) -> Self {
        match self {
            CalcError::InvalidMeasurement { path, message } => CalcError::InvalidMeasurement {
                path: format!("{}.{}", prefix, path),
                message,
            },
        }
    }
}

/// Result 类型别名
pub type CalcResult<T> = Result<T, CalcError>;
