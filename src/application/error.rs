//! 应用层错误定义
//!
//! 统一的命令/查询错误类型。`Display` 即展示给用户的文案。

use thiserror::Error;

use crate::application::ports::BackendError;
use crate::domain::generation::DomainError;

/// 任务失败时展示的固定文案（不透出后端细节）
pub const GENERATION_FAILED_MESSAGE: &str = "Generation failed. Try again.";

/// 应用层错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApplicationError {
    /// 本地校验失败，未发起请求
    #[error("{0}")]
    ValidationError(String),

    /// 后端拒绝或不可达
    #[error("{0}")]
    BackendError(String),

    /// 后端返回的数据不满足约定
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 展示给用户的文案
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<BackendError> for ApplicationError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::InvalidResponse(msg) => Self::InvalidResponse(msg),
            other => Self::BackendError(other.user_message()),
        }
    }
}

impl From<DomainError> for ApplicationError {
    fn from(err: DomainError) -> Self {
        Self::ValidationError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_detail_is_surfaced() {
        let err: ApplicationError = BackendError::ServiceError {
            status: 422,
            detail: "batch_size too large".to_string(),
        }
        .into();
        assert_eq!(err.user_message(), "batch_size too large");
    }

    #[test]
    fn test_domain_error_is_validation() {
        let err: ApplicationError = DomainError::MissingContent.into();
        assert!(matches!(err, ApplicationError::ValidationError(_)));
    }
}
