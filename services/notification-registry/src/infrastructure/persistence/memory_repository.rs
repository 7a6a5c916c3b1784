//! 内存 installation 仓储
//!
//! 两张并发 map：installation → 记录和订阅集合，topic → 订阅者集合（反向索引）。
//! 加锁顺序固定为先 `installations` 分片再 `subscribers` 分片，
//! 持有 `subscribers` 的引用时不访问 `installations`。

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use metrics::gauge;
use notify_errors::AppResult;

use crate::domain::{
    Installation, InstallationId, InstallationRepository, InstallationView, Registration, TopicId,
};

/// 在分片锁内按增减更新，不读取 map 长度
const INSTALLATIONS_GAUGE: &str = "registry_installations";

struct InstallationState {
    installation: Installation,
    topics: BTreeSet<TopicId>,
}

/// 内存 installation 仓储，进程重启后数据丢失
#[derive(Default)]
pub struct InMemoryInstallationRepository {
    installations: DashMap<InstallationId, InstallationState>,
    subscribers: DashMap<TopicId, BTreeSet<InstallationId>>,
}

impl InMemoryInstallationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前 installation 数量
    pub fn installation_count(&self) -> usize {
        self.installations.len()
    }

    /// 当前至少有一个订阅者的 topic 数量
    pub fn topic_count(&self) -> usize {
        self.subscribers.len()
    }

    fn unindex(&self, id: &InstallationId, topic: &TopicId) {
        if let Entry::Occupied(mut entry) = self.subscribers.entry(topic.clone()) {
            entry.get_mut().remove(id);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}

#[async_trait]
impl InstallationRepository for InMemoryInstallationRepository {
    async fn upsert(&self, registration: Registration) -> AppResult<Installation> {
        let now = Utc::now();

        let installation = match self.installations.entry(registration.id.clone()) {
            Entry::Occupied(mut entry) => {
                let state = entry.get_mut();
                state.installation.reregister(registration, now);
                state.installation.clone()
            }
            Entry::Vacant(entry) => {
                let installation = Installation::register(registration, now);
                entry.insert(InstallationState {
                    installation: installation.clone(),
                    topics: BTreeSet::new(),
                });
                gauge!(INSTALLATIONS_GAUGE).increment(1.0);
                installation
            }
        };

        Ok(installation)
    }

    async fn delete(&self, id: &InstallationId) -> AppResult<bool> {
        // 反向索引在 installation 分片锁内清理，避免与同 ID 的并发订阅交错
        let existed = match self.installations.entry(id.clone()) {
            Entry::Occupied(entry) => {
                for topic in &entry.get().topics {
                    self.unindex(id, topic);
                }
                entry.remove();
                gauge!(INSTALLATIONS_GAUGE).decrement(1.0);
                true
            }
            Entry::Vacant(_) => false,
        };

        Ok(existed)
    }

    async fn subscribe(
        &self,
        id: &InstallationId,
        topics: &BTreeSet<TopicId>,
    ) -> AppResult<Option<usize>> {
        let Some(mut state) = self.installations.get_mut(id) else {
            return Ok(None);
        };

        let mut added = 0;
        for topic in topics {
            if state.topics.insert(topic.clone()) {
                self.subscribers
                    .entry(topic.clone())
                    .or_default()
                    .insert(id.clone());
                added += 1;
            }
        }

        Ok(Some(added))
    }

    async fn unsubscribe(
        &self,
        id: &InstallationId,
        topics: &BTreeSet<TopicId>,
    ) -> AppResult<Option<usize>> {
        let Some(mut state) = self.installations.get_mut(id) else {
            return Ok(None);
        };

        let mut removed = 0;
        for topic in topics {
            if state.topics.remove(topic) {
                self.unindex(id, topic);
                removed += 1;
            }
        }

        Ok(Some(removed))
    }

    async fn find_by_id(&self, id: &InstallationId) -> AppResult<Option<InstallationView>> {
        Ok(self.installations.get(id).map(|state| InstallationView {
            installation: state.installation.clone(),
            topics: state.topics.clone(),
        }))
    }

    async fn list_subscribers(&self, topic: &TopicId) -> AppResult<Vec<Installation>> {
        // 先复制 ID 集合并释放 subscribers 的引用，再逐个读取 installation
        let ids: Vec<InstallationId> = match self.subscribers.get(topic) {
            Some(ids) => ids.iter().cloned().collect(),
            None => return Ok(Vec::new()),
        };

        // 读取期间可能有并发取消订阅，以 installation 自身的订阅集合为准
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.installations
                    .get(id)
                    .filter(|state| state.topics.contains(topic))
                    .map(|state| state.installation.clone())
            })
            .collect())
    }
}
