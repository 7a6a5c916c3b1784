//! 领域类型与 proto 消息之间的转换

use chrono::{DateTime, Utc};

use crate::api::proto::notifications::{
    DeliveryKind as ProtoDeliveryKind, Installation as ProtoInstallation,
    InstallationMetadata as ProtoMetadata,
};
use crate::domain::{DeliveryKind, Installation, InstallationView};

pub fn timestamp(time: &DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    }
}

/// 未指定或未知的值按 Custom 处理
pub fn delivery_kind_from_proto(value: i32) -> DeliveryKind {
    match ProtoDeliveryKind::try_from(value) {
        Ok(ProtoDeliveryKind::Apns) => DeliveryKind::Apns,
        Ok(ProtoDeliveryKind::Firebase) => DeliveryKind::Firebase,
        _ => DeliveryKind::Custom,
    }
}

pub fn delivery_kind_to_proto(kind: DeliveryKind) -> ProtoDeliveryKind {
    match kind {
        DeliveryKind::Apns => ProtoDeliveryKind::Apns,
        DeliveryKind::Firebase => ProtoDeliveryKind::Firebase,
        DeliveryKind::Custom => ProtoDeliveryKind::Custom,
    }
}

/// 不带订阅列表
pub fn installation_to_proto(installation: &Installation) -> ProtoInstallation {
    ProtoInstallation {
        installation_id: installation.id.as_bytes().to_vec(),
        delivery_token: installation.token.as_bytes().to_vec(),
        delivery_kind: delivery_kind_to_proto(installation.kind) as i32,
        metadata: Some(ProtoMetadata {
            locale: installation.metadata.locale.clone().unwrap_or_default(),
            app_version: installation.metadata.app_version.clone().unwrap_or_default(),
        }),
        registered_at: Some(timestamp(&installation.registered_at)),
        updated_at: Some(timestamp(&installation.updated_at)),
        topic_ids: Vec::new(),
    }
}

pub fn view_to_proto(view: &InstallationView) -> ProtoInstallation {
    ProtoInstallation {
        topic_ids: view.topics.iter().map(|t| t.as_bytes().to_vec()).collect(),
        ..installation_to_proto(&view.installation)
    }
}
