//! notify-errors - 统一错误处理
//!
//! 所有 crate 共用的错误类型，以及到 gRPC 状态码的映射

use thiserror::Error;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 转换为 gRPC 状态码
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            Self::NotFound(_) => tonic::Code::NotFound,
            Self::Validation(_) => tonic::Code::InvalidArgument,
            Self::Timeout(_) => tonic::Code::DeadlineExceeded,
            Self::Database(_) => tonic::Code::Internal,
            Self::Internal(_) => tonic::Code::Internal,
        }
    }

    /// 指标标签用的短名称
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "invalid_argument",
            Self::Timeout(_) => "timeout",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<AppError> for tonic::Status {
    fn from(err: AppError) -> Self {
        match err {
            // 存储层细节只进日志，不返回给客户端
            AppError::Database(_) => tonic::Status::internal("Storage failure"),
            other => tonic::Status::new(other.grpc_code(), other.to_string()),
        }
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grpc_code_mapping() {
        assert_eq!(AppError::not_found("x").grpc_code(), tonic::Code::NotFound);
        assert_eq!(
            AppError::validation("x").grpc_code(),
            tonic::Code::InvalidArgument
        );
        assert_eq!(
            AppError::timeout("x").grpc_code(),
            tonic::Code::DeadlineExceeded
        );
        assert_eq!(AppError::database("x").grpc_code(), tonic::Code::Internal);
        assert_eq!(AppError::internal("x").grpc_code(), tonic::Code::Internal);
    }

    #[test]
    fn test_database_error_is_not_leaked() {
        let status: tonic::Status =
            AppError::database("relation \"installations\" does not exist").into();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("installations"));
    }

    #[test]
    fn test_status_keeps_message() {
        let status: tonic::Status = AppError::not_found("Installation not found").into();
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("Installation not found"));
    }
}
