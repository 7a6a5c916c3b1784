//! 注册表查询

use super::commands::{validate_installation_id, validate_topic_id};
use crate::config::RegistryLimits;
use crate::domain::{InstallationId, TopicId};
use crate::error::RegistryError;

/// 查询单个 installation
#[derive(Debug, Clone, Default)]
pub struct GetInstallationQuery {
    pub installation_id: Vec<u8>,
}

impl GetInstallationQuery {
    pub fn validate(self, limits: &RegistryLimits) -> Result<InstallationId, RegistryError> {
        validate_installation_id(self.installation_id, limits)
    }
}

/// 查询订阅了某个 topic 的 installation
#[derive(Debug, Clone, Default)]
pub struct ListSubscribersQuery {
    pub topic_id: Vec<u8>,
}

impl ListSubscribersQuery {
    pub fn validate(self, limits: &RegistryLimits) -> Result<TopicId, RegistryError> {
        validate_topic_id(self.topic_id, limits)
    }
}
