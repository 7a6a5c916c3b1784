//! 服务配置

use std::time::Duration;

use notify_config::{RegistryConfig, UnknownInstallationPolicy};

/// 元数据字符串的最大字节数
pub const MAX_METADATA_BYTES: usize = 64;

/// 请求字段的长度限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryLimits {
    pub max_id_bytes: usize,
    pub max_token_bytes: usize,
    pub max_topics_per_request: usize,
    pub max_metadata_bytes: usize,
}

impl Default for RegistryLimits {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for RegistryLimits {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            max_id_bytes: config.max_id_bytes,
            max_token_bytes: config.max_token_bytes,
            max_topics_per_request: config.max_topics_per_request,
            max_metadata_bytes: MAX_METADATA_BYTES,
        }
    }
}

/// 注册表运行参数
#[derive(Debug, Clone, Copy)]
pub struct RegistrySettings {
    /// 单次存储操作的超时
    pub operation_timeout: Duration,
    pub limits: RegistryLimits,
    pub unknown_unsubscribe: UnknownInstallationPolicy,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self::from(&RegistryConfig::default())
    }
}

impl From<&RegistryConfig> for RegistrySettings {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
            limits: RegistryLimits::from(config),
            unknown_unsubscribe: config.unknown_unsubscribe,
        }
    }
}

impl RegistrySettings {
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_unknown_unsubscribe(mut self, policy: UnknownInstallationPolicy) -> Self {
        self.unknown_unsubscribe = policy;
        self
    }

    pub fn with_limits(mut self, limits: RegistryLimits) -> Self {
        self.limits = limits;
        self
    }
}
