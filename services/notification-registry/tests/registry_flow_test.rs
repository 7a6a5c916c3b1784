//! 注册表完整流程测试（内存存储）

use std::sync::Arc;

use notification_registry::application::{
    DeleteInstallationCommand, GetInstallationQuery, ListSubscribersQuery,
    RegisterInstallationCommand, RegistryHandler, SubscribeCommand, UnsubscribeCommand,
};
use notification_registry::config::RegistrySettings;
use notification_registry::domain::{DeliveryKind, TopicId};
use notification_registry::infrastructure::persistence::InMemoryInstallationRepository;
use notify_config::UnknownInstallationPolicy;
use notify_errors::AppError;

fn handler() -> RegistryHandler {
    RegistryHandler::new(
        Arc::new(InMemoryInstallationRepository::new()),
        RegistrySettings::default(),
    )
}

fn register(id: &str, token: &str) -> RegisterInstallationCommand {
    RegisterInstallationCommand {
        installation_id: id.as_bytes().to_vec(),
        delivery_token: token.as_bytes().to_vec(),
        delivery_kind: DeliveryKind::Apns,
        locale: Some("en".to_string()),
        app_version: None,
    }
}

fn subscribe(id: &str, topics: &[&str]) -> SubscribeCommand {
    SubscribeCommand {
        installation_id: id.as_bytes().to_vec(),
        topic_ids: topics.iter().map(|t| t.as_bytes().to_vec()).collect(),
    }
}

fn unsubscribe(id: &str, topics: &[&str]) -> UnsubscribeCommand {
    UnsubscribeCommand {
        installation_id: id.as_bytes().to_vec(),
        topic_ids: topics.iter().map(|t| t.as_bytes().to_vec()).collect(),
    }
}

fn delete(id: &str) -> DeleteInstallationCommand {
    DeleteInstallationCommand {
        installation_id: id.as_bytes().to_vec(),
    }
}

async fn topics_of(handler: &RegistryHandler, id: &str) -> Vec<Vec<u8>> {
    handler
        .get(GetInstallationQuery {
            installation_id: id.as_bytes().to_vec(),
        })
        .await
        .unwrap()
        .topics
        .into_iter()
        .map(TopicId::into_bytes)
        .collect()
}

async fn subscriber_ids(handler: &RegistryHandler, topic: &str) -> Vec<Vec<u8>> {
    handler
        .list_subscribers(ListSubscribersQuery {
            topic_id: topic.as_bytes().to_vec(),
        })
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.id.into_bytes())
        .collect()
}

#[tokio::test]
async fn test_reregister_keeps_one_record_with_latest_token() {
    let handler = handler();

    let first = handler.register(register("dev1", "tok1")).await.unwrap();
    let second = handler.register(register("dev1", "tok2")).await.unwrap();

    let view = handler
        .get(GetInstallationQuery {
            installation_id: b"dev1".to_vec(),
        })
        .await
        .unwrap();

    assert_eq!(view.installation.token.as_bytes(), b"tok2");
    assert_eq!(view.installation.metadata.locale.as_deref(), Some("en"));
    assert_eq!(second.registered_at, first.registered_at);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_delete_removes_subscriptions() {
    let handler = handler();

    handler.register(register("dev1", "tok1")).await.unwrap();
    handler.subscribe(subscribe("dev1", &["A", "B"])).await.unwrap();
    handler.delete(delete("dev1")).await.unwrap();

    let err = handler.subscribe(subscribe("dev1", &["C"])).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(subscriber_ids(&handler, "A").await.is_empty());

    // 重新注册后没有旧订阅
    handler.register(register("dev1", "tok1")).await.unwrap();
    assert!(topics_of(&handler, "dev1").await.is_empty());
}

#[tokio::test]
async fn test_delete_never_registered_succeeds() {
    let handler = handler();
    handler.delete(delete("ghost")).await.unwrap();
    handler.delete(delete("ghost")).await.unwrap();
}

#[tokio::test]
async fn test_subscribe_twice_is_a_set() {
    let handler = handler();

    handler.register(register("dev1", "tok1")).await.unwrap();
    handler.subscribe(subscribe("dev1", &["A"])).await.unwrap();
    handler.subscribe(subscribe("dev1", &["A"])).await.unwrap();

    assert_eq!(topics_of(&handler, "dev1").await, vec![b"A".to_vec()]);
}

#[tokio::test]
async fn test_unsubscribe_not_subscribed_topic_is_noop() {
    let handler = handler();

    handler.register(register("dev1", "tok1")).await.unwrap();
    handler.subscribe(subscribe("dev1", &["A"])).await.unwrap();
    handler.unsubscribe(unsubscribe("dev1", &["Z"])).await.unwrap();

    assert_eq!(topics_of(&handler, "dev1").await, vec![b"A".to_vec()]);
}

#[tokio::test]
async fn test_subscribe_then_partial_unsubscribe() {
    let handler = handler();

    handler.register(register("dev1", "tok1")).await.unwrap();
    handler.subscribe(subscribe("dev1", &["A", "B"])).await.unwrap();
    handler.unsubscribe(unsubscribe("dev1", &["A"])).await.unwrap();

    assert_eq!(topics_of(&handler, "dev1").await, vec![b"B".to_vec()]);
}

#[tokio::test]
async fn test_subscribe_empty_list_still_checks_installation() {
    let handler = handler();

    let err = handler.subscribe(subscribe("ghost", &[])).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    handler.register(register("dev1", "tok1")).await.unwrap();
    handler.subscribe(subscribe("dev1", &[])).await.unwrap();
}

#[tokio::test]
async fn test_unsubscribe_unknown_installation() {
    let lenient = handler();
    lenient.unsubscribe(unsubscribe("ghost", &["A"])).await.unwrap();

    let strict = RegistryHandler::new(
        Arc::new(InMemoryInstallationRepository::new()),
        RegistrySettings::default().with_unknown_unsubscribe(UnknownInstallationPolicy::NotFound),
    );
    let err = strict.unsubscribe(unsubscribe("ghost", &["A"])).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_reverse_index_matches_topic_sets() {
    let handler = handler();

    for id in ["dev3", "dev1", "dev2"] {
        handler.register(register(id, "tok")).await.unwrap();
    }
    handler.subscribe(subscribe("dev1", &["news", "sport"])).await.unwrap();
    handler.subscribe(subscribe("dev2", &["news"])).await.unwrap();
    handler.subscribe(subscribe("dev3", &["news", "sport"])).await.unwrap();

    assert_eq!(
        subscriber_ids(&handler, "news").await,
        vec![b"dev1".to_vec(), b"dev2".to_vec(), b"dev3".to_vec()]
    );

    handler.unsubscribe(unsubscribe("dev1", &["news"])).await.unwrap();
    handler.delete(delete("dev3")).await.unwrap();

    assert_eq!(subscriber_ids(&handler, "news").await, vec![b"dev2".to_vec()]);
    assert_eq!(subscriber_ids(&handler, "sport").await, vec![b"dev1".to_vec()]);
    assert!(subscriber_ids(&handler, "weather").await.is_empty());
}

#[tokio::test]
async fn test_validation_errors() {
    let handler = handler();

    let err = handler.register(register("", "tok")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = handler.register(register("dev1", "")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = handler.delete(delete("")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    handler.register(register("dev1", "tok")).await.unwrap();
    let err = handler.subscribe(subscribe("dev1", &["A", ""])).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    // 校验失败时不会写入部分订阅
    assert!(topics_of(&handler, "dev1").await.is_empty());
}
