//! Installation 仓储接口

use std::collections::BTreeSet;

use async_trait::async_trait;
use notify_errors::AppResult;

use super::installation::{Installation, InstallationId, InstallationView, Registration, TopicId};

/// Installation 仓储接口
///
/// 同一个 installation 上的操作必须可线性化；删除 installation 时其订阅一并删除
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InstallationRepository: Send + Sync {
    /// 创建或替换 installation，已有订阅保持不变
    async fn upsert(&self, registration: Registration) -> AppResult<Installation>;

    /// 删除 installation 及其全部订阅，返回是否存在过
    async fn delete(&self, id: &InstallationId) -> AppResult<bool>;

    /// 添加订阅，返回新增的数量；installation 不存在时返回 None
    async fn subscribe(
        &self,
        id: &InstallationId,
        topics: &BTreeSet<TopicId>,
    ) -> AppResult<Option<usize>>;

    /// 移除订阅，返回实际移除的数量；installation 不存在时返回 None
    async fn unsubscribe(
        &self,
        id: &InstallationId,
        topics: &BTreeSet<TopicId>,
    ) -> AppResult<Option<usize>>;

    /// 根据 ID 查找 installation 和它的订阅
    async fn find_by_id(&self, id: &InstallationId) -> AppResult<Option<InstallationView>>;

    /// 订阅了该 topic 的 installation，按 ID 字节序排列
    async fn list_subscribers(&self, topic: &TopicId) -> AppResult<Vec<Installation>>;
}
