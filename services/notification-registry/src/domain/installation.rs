//! Installation 聚合
//!
//! 一个 installation 对应一个设备上的应用实例，持有一个推送 token 和一组订阅的 topic。
//! installation id 和 topic id 都是调用方给出的不透明字节串。

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn into_bytes(self) -> Vec<u8> {
                self.0
            }
        }

        /// 日志中统一以十六进制显示
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

opaque_id!(
    /// Installation ID
    InstallationId
);

opaque_id!(
    /// Topic ID
    TopicId
);

/// 推送 token
///
/// Debug 输出不包含 token 内容
#[derive(Clone, PartialEq, Eq)]
pub struct DeliveryToken(Vec<u8>);

impl DeliveryToken {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DeliveryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeliveryToken(<{} bytes>)", self.0.len())
    }
}

/// token 所属的推送通道
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeliveryKind {
    Apns,
    Firebase,
    #[default]
    Custom,
}

impl DeliveryKind {
    /// 存储用的编码，与 proto 枚举值一致
    pub fn code(self) -> i16 {
        match self {
            Self::Apns => 1,
            Self::Firebase => 2,
            Self::Custom => 3,
        }
    }

    /// 未知编码按 Custom 处理
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Self::Apns,
            2 => Self::Firebase,
            _ => Self::Custom,
        }
    }
}

/// 可选的客户端元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallationMetadata {
    pub locale: Option<String>,
    pub app_version: Option<String>,
}

/// 注册请求经过校验后的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: InstallationId,
    pub token: DeliveryToken,
    pub kind: DeliveryKind,
    pub metadata: InstallationMetadata,
}

/// 已存储的 installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub id: InstallationId,
    pub token: DeliveryToken,
    pub kind: DeliveryKind,
    pub metadata: InstallationMetadata,
    /// 首次注册时间，重复注册不变
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installation {
    pub fn register(registration: Registration, now: DateTime<Utc>) -> Self {
        Self {
            id: registration.id,
            token: registration.token,
            kind: registration.kind,
            metadata: registration.metadata,
            registered_at: now,
            updated_at: now,
        }
    }

    /// 重复注册：替换 token 和元数据，保留 `registered_at`
    pub fn reregister(&mut self, registration: Registration, now: DateTime<Utc>) {
        debug_assert_eq!(self.id, registration.id);
        self.token = registration.token;
        self.kind = registration.kind;
        self.metadata = registration.metadata;
        self.updated_at = now;
    }
}

/// installation 及其当前订阅的 topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationView {
    pub installation: Installation,
    pub topics: BTreeSet<TopicId>,
}
