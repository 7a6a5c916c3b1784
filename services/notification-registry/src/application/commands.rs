//! 注册表命令
//!
//! 每个命令在访问存储之前先做校验，校验结果直接转换成领域类型

use std::collections::BTreeSet;

use crate::config::RegistryLimits;
use crate::domain::{
    DeliveryKind, DeliveryToken, InstallationId, InstallationMetadata, Registration, TopicId,
};
use crate::error::RegistryError;

/// 注册 installation
#[derive(Debug, Clone, Default)]
pub struct RegisterInstallationCommand {
    pub installation_id: Vec<u8>,
    pub delivery_token: Vec<u8>,
    pub delivery_kind: DeliveryKind,
    pub locale: Option<String>,
    pub app_version: Option<String>,
}

impl RegisterInstallationCommand {
    pub fn validate(self, limits: &RegistryLimits) -> Result<Registration, RegistryError> {
        let id = validate_installation_id(self.installation_id, limits)?;

        if self.delivery_token.is_empty() {
            return Err(RegistryError::EmptyDeliveryToken);
        }
        if self.delivery_token.len() > limits.max_token_bytes {
            return Err(RegistryError::DeliveryTokenTooLong {
                max: limits.max_token_bytes,
            });
        }

        let metadata = InstallationMetadata {
            locale: validate_metadata("locale", self.locale, limits)?,
            app_version: validate_metadata("app_version", self.app_version, limits)?,
        };

        Ok(Registration {
            id,
            token: DeliveryToken::new(self.delivery_token),
            kind: self.delivery_kind,
            metadata,
        })
    }
}

/// 删除 installation
#[derive(Debug, Clone, Default)]
pub struct DeleteInstallationCommand {
    pub installation_id: Vec<u8>,
}

impl DeleteInstallationCommand {
    pub fn validate(self, limits: &RegistryLimits) -> Result<InstallationId, RegistryError> {
        validate_installation_id(self.installation_id, limits)
    }
}

/// 订阅 topic
#[derive(Debug, Clone, Default)]
pub struct SubscribeCommand {
    pub installation_id: Vec<u8>,
    pub topic_ids: Vec<Vec<u8>>,
}

impl SubscribeCommand {
    pub fn validate(
        self,
        limits: &RegistryLimits,
    ) -> Result<(InstallationId, BTreeSet<TopicId>), RegistryError> {
        let id = validate_installation_id(self.installation_id, limits)?;
        let topics = validate_topics(self.topic_ids, limits)?;
        Ok((id, topics))
    }
}

/// 取消订阅 topic
#[derive(Debug, Clone, Default)]
pub struct UnsubscribeCommand {
    pub installation_id: Vec<u8>,
    pub topic_ids: Vec<Vec<u8>>,
}

impl UnsubscribeCommand {
    pub fn validate(
        self,
        limits: &RegistryLimits,
    ) -> Result<(InstallationId, BTreeSet<TopicId>), RegistryError> {
        let id = validate_installation_id(self.installation_id, limits)?;
        let topics = validate_topics(self.topic_ids, limits)?;
        Ok((id, topics))
    }
}

pub(crate) fn validate_installation_id(
    bytes: Vec<u8>,
    limits: &RegistryLimits,
) -> Result<InstallationId, RegistryError> {
    if bytes.is_empty() {
        return Err(RegistryError::EmptyInstallationId);
    }
    if bytes.len() > limits.max_id_bytes {
        return Err(RegistryError::InstallationIdTooLong {
            max: limits.max_id_bytes,
        });
    }
    Ok(InstallationId::new(bytes))
}

pub(crate) fn validate_topic_id(
    bytes: Vec<u8>,
    limits: &RegistryLimits,
) -> Result<TopicId, RegistryError> {
    if bytes.is_empty() {
        return Err(RegistryError::EmptyTopicId);
    }
    if bytes.len() > limits.max_id_bytes {
        return Err(RegistryError::TopicIdTooLong {
            max: limits.max_id_bytes,
        });
    }
    Ok(TopicId::new(bytes))
}

/// 重复的 topic 合并为一个
fn validate_topics(
    topic_ids: Vec<Vec<u8>>,
    limits: &RegistryLimits,
) -> Result<BTreeSet<TopicId>, RegistryError> {
    if topic_ids.len() > limits.max_topics_per_request {
        return Err(RegistryError::TooManyTopics {
            count: topic_ids.len(),
            max: limits.max_topics_per_request,
        });
    }
    topic_ids
        .into_iter()
        .map(|bytes| validate_topic_id(bytes, limits))
        .collect()
}

/// 空字符串视为未设置
fn validate_metadata(
    field: &'static str,
    value: Option<String>,
    limits: &RegistryLimits,
) -> Result<Option<String>, RegistryError> {
    match value {
        Some(v) if v.len() > limits.max_metadata_bytes => Err(RegistryError::MetadataTooLong {
            field,
            max: limits.max_metadata_bytes,
        }),
        Some(v) if v.is_empty() => Ok(None),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> RegistryLimits {
        RegistryLimits {
            max_id_bytes: 8,
            max_token_bytes: 16,
            max_topics_per_request: 3,
            max_metadata_bytes: 4,
        }
    }

    fn register(id: &[u8], token: &[u8]) -> RegisterInstallationCommand {
        RegisterInstallationCommand {
            installation_id: id.to_vec(),
            delivery_token: token.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_requires_id_and_token() {
        assert_eq!(
            register(b"", b"tok").validate(&limits()),
            Err(RegistryError::EmptyInstallationId)
        );
        assert_eq!(
            register(b"dev1", b"").validate(&limits()),
            Err(RegistryError::EmptyDeliveryToken)
        );
    }

    #[test]
    fn test_register_size_limits() {
        assert_eq!(
            register(b"123456789", b"tok").validate(&limits()),
            Err(RegistryError::InstallationIdTooLong { max: 8 })
        );
        assert_eq!(
            register(b"dev1", &[7u8; 17]).validate(&limits()),
            Err(RegistryError::DeliveryTokenTooLong { max: 16 })
        );
        assert!(register(b"12345678", &[7u8; 16]).validate(&limits()).is_ok());
    }

    #[test]
    fn test_register_metadata() {
        let mut cmd = register(b"dev1", b"tok");
        cmd.locale = Some("en-US".to_string());
        assert_eq!(
            cmd.validate(&limits()),
            Err(RegistryError::MetadataTooLong {
                field: "locale",
                max: 4
            })
        );

        let mut cmd = register(b"dev1", b"tok");
        cmd.locale = Some(String::new());
        cmd.app_version = Some("1.2".to_string());
        let registration = cmd.validate(&limits()).unwrap();
        assert_eq!(registration.metadata.locale, None);
        assert_eq!(registration.metadata.app_version.as_deref(), Some("1.2"));
    }

    #[test]
    fn test_subscribe_collapses_duplicates() {
        let cmd = SubscribeCommand {
            installation_id: b"dev1".to_vec(),
            topic_ids: vec![b"A".to_vec(), b"B".to_vec(), b"A".to_vec()],
        };
        let (id, topics) = cmd.validate(&limits()).unwrap();
        assert_eq!(id.as_bytes(), b"dev1");
        assert_eq!(topics.len(), 2);
    }

    #[test]
    fn test_subscribe_rejects_bad_topics() {
        let empty_topic = SubscribeCommand {
            installation_id: b"dev1".to_vec(),
            topic_ids: vec![b"A".to_vec(), Vec::new()],
        };
        assert_eq!(
            empty_topic.validate(&limits()),
            Err(RegistryError::EmptyTopicId)
        );

        let too_many = UnsubscribeCommand {
            installation_id: b"dev1".to_vec(),
            topic_ids: vec![b"A".to_vec(); 4],
        };
        assert_eq!(
            too_many.validate(&limits()),
            Err(RegistryError::TooManyTopics { count: 4, max: 3 })
        );
    }

    #[test]
    fn test_empty_topic_list_is_accepted() {
        let cmd = SubscribeCommand {
            installation_id: b"dev1".to_vec(),
            topic_ids: Vec::new(),
        };
        let (_, topics) = cmd.validate(&limits()).unwrap();
        assert!(topics.is_empty());
    }

    #[test]
    fn test_delete_requires_id() {
        let cmd = DeleteInstallationCommand {
            installation_id: Vec::new(),
        };
        assert_eq!(
            cmd.validate(&limits()),
            Err(RegistryError::EmptyInstallationId)
        );
    }
}
