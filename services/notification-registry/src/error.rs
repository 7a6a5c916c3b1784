//! 注册表错误

use notify_errors::AppError;
use thiserror::Error;
use tonic::Status;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("installation_id must not be empty")]
    EmptyInstallationId,
    #[error("installation_id must be at most {max} bytes")]
    InstallationIdTooLong { max: usize },
    #[error("delivery_token must not be empty")]
    EmptyDeliveryToken,
    #[error("delivery_token must be at most {max} bytes")]
    DeliveryTokenTooLong { max: usize },
    #[error("topic_id must not be empty")]
    EmptyTopicId,
    #[error("topic_id must be at most {max} bytes")]
    TopicIdTooLong { max: usize },
    #[error("at most {max} topic_ids per request, got {count}")]
    TooManyTopics { count: usize, max: usize },
    #[error("metadata.{field} must be at most {max} bytes")]
    MetadataTooLong { field: &'static str, max: usize },
    #[error("Installation not found")]
    InstallationNotFound,
    #[error("Storage operation did not finish within {0} ms")]
    Timeout(u64),
}

impl From<RegistryError> for AppError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::InstallationNotFound => AppError::not_found(error.to_string()),
            RegistryError::Timeout(_) => AppError::timeout(error.to_string()),
            _ => AppError::validation(error.to_string()),
        }
    }
}

impl From<RegistryError> for Status {
    fn from(error: RegistryError) -> Self {
        AppError::from(error).into()
    }
}
