//! 并发测试
//!
//! 同一 installation 上的并发操作结果必须等价于某个串行顺序

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use notification_registry::domain::{
    DeliveryKind, DeliveryToken, InstallationId, InstallationMetadata, InstallationRepository,
    Registration, TopicId,
};
use notification_registry::infrastructure::persistence::InMemoryInstallationRepository;

fn registration(id: &[u8], token: &[u8]) -> Registration {
    Registration {
        id: InstallationId::new(id.to_vec()),
        token: DeliveryToken::new(token.to_vec()),
        kind: DeliveryKind::Custom,
        metadata: InstallationMetadata::default(),
    }
}

fn topic_set(names: &[&str]) -> BTreeSet<TopicId> {
    names
        .iter()
        .map(|n| TopicId::new(n.as_bytes().to_vec()))
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_register_and_delete_same_id() {
    let repo = Arc::new(InMemoryInstallationRepository::new());
    let id = InstallationId::new(b"dev1".to_vec());

    for round in 0..50 {
        let tasks = (0..16).map(|i| {
            let repo = repo.clone();
            let id = id.clone();
            tokio::spawn(async move {
                match i % 3 {
                    0 => {
                        let token = format!("tok-{}-{}", round, i);
                        repo.upsert(registration(b"dev1", token.as_bytes()))
                            .await
                            .map(|_| ())
                    }
                    1 => repo.delete(&id).await.map(|_| ()),
                    _ => repo
                        .subscribe(&id, &topic_set(&["A", "B"]))
                        .await
                        .map(|_| ()),
                }
            })
        });

        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }

        // 任意结果都必须满足：不存在时反向索引里也没有它
        let view = repo.find_by_id(&id).await.unwrap();
        for topic in topic_set(&["A", "B"]) {
            let subscribed = repo
                .list_subscribers(&topic)
                .await
                .unwrap()
                .iter()
                .any(|i| i.id == id);
            let expected = view
                .as_ref()
                .map(|v| v.topics.contains(&topic))
                .unwrap_or(false);
            assert_eq!(subscribed, expected, "round {}", round);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_ids_do_not_interfere() {
    let repo = Arc::new(InMemoryInstallationRepository::new());

    let tasks = (0..64u32).map(|i| {
        let repo = repo.clone();
        tokio::spawn(async move {
            let raw = i.to_be_bytes();
            let id = InstallationId::new(raw.to_vec());
            repo.upsert(registration(&raw, b"tok")).await.unwrap();
            repo.subscribe(&id, &topic_set(&["shared", "odd-even"]))
                .await
                .unwrap();
            if i % 2 == 0 {
                repo.unsubscribe(&id, &topic_set(&["odd-even"])).await.unwrap();
            }
        })
    });

    for result in join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(repo.installation_count(), 64);

    let shared = repo
        .list_subscribers(&TopicId::new(b"shared".to_vec()))
        .await
        .unwrap();
    assert_eq!(shared.len(), 64);
    // 按 ID 字节序返回
    assert!(shared.windows(2).all(|w| w[0].id < w[1].id));

    let odd = repo
        .list_subscribers(&TopicId::new(b"odd-even".to_vec()))
        .await
        .unwrap();
    assert_eq!(odd.len(), 32);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_subscribe_and_list_concurrently() {
    let repo = Arc::new(InMemoryInstallationRepository::new());
    let topic = TopicId::new(b"live".to_vec());

    for i in 0..32u8 {
        repo.upsert(registration(&[i], b"tok")).await.unwrap();
    }

    let writers = (0..32u8).map(|i| {
        let repo = repo.clone();
        tokio::spawn(async move {
            let id = InstallationId::new(vec![i]);
            for _ in 0..20 {
                repo.subscribe(&id, &topic_set(&["live"])).await.unwrap();
                repo.unsubscribe(&id, &topic_set(&["live"])).await.unwrap();
            }
            repo.subscribe(&id, &topic_set(&["live"])).await.unwrap();
        })
    });

    let reader = {
        let repo = repo.clone();
        let topic = topic.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                let listed = repo.list_subscribers(&topic).await.unwrap();
                assert!(listed.len() <= 32);
                tokio::task::yield_now().await;
            }
        })
    };

    for result in join_all(writers).await {
        result.unwrap();
    }
    reader.await.unwrap();

    assert_eq!(repo.list_subscribers(&topic).await.unwrap().len(), 32);
}
