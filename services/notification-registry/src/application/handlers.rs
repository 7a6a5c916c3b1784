//! 注册表处理器
//!
//! 校验请求、给每次存储调用加超时，并按配置处理未知 installation 的取消订阅

use std::future::Future;
use std::sync::Arc;

use metrics::counter;
use notify_config::UnknownInstallationPolicy;
use notify_errors::AppResult;
use tracing::{debug, info};

use super::commands::*;
use super::queries::*;
use crate::config::RegistrySettings;
use crate::domain::{Installation, InstallationRepository, InstallationView};
use crate::error::RegistryError;

/// 注册表处理器
pub struct RegistryHandler {
    repo: Arc<dyn InstallationRepository>,
    settings: RegistrySettings,
}

impl RegistryHandler {
    pub fn new(repo: Arc<dyn InstallationRepository>, settings: RegistrySettings) -> Self {
        Self { repo, settings }
    }

    /// 注册或替换 installation
    pub async fn register(&self, cmd: RegisterInstallationCommand) -> AppResult<Installation> {
        let result: AppResult<Installation> = async {
            let registration = cmd.validate(&self.settings.limits)?;
            let installation = self.bounded(self.repo.upsert(registration)).await?;

            info!(
                installation_id = %installation.id,
                delivery_kind = ?installation.kind,
                "Installation registered"
            );
            Ok(installation)
        }
        .await;

        observe("register", result)
    }

    /// 删除 installation，不存在时也返回成功
    pub async fn delete(&self, cmd: DeleteInstallationCommand) -> AppResult<()> {
        let result: AppResult<()> = async {
            let id = cmd.validate(&self.settings.limits)?;
            let existed = self.bounded(self.repo.delete(&id)).await?;

            if existed {
                info!(installation_id = %id, "Installation deleted");
            } else {
                debug!(installation_id = %id, "Delete of unknown installation ignored");
            }
            Ok(())
        }
        .await;

        observe("delete", result)
    }

    /// 订阅 topic，installation 不存在时返回 NotFound
    pub async fn subscribe(&self, cmd: SubscribeCommand) -> AppResult<()> {
        let result: AppResult<()> = async {
            let (id, topics) = cmd.validate(&self.settings.limits)?;
            let added = self
                .bounded(self.repo.subscribe(&id, &topics))
                .await?
                .ok_or(RegistryError::InstallationNotFound)?;

            debug!(
                installation_id = %id,
                requested = topics.len(),
                added,
                "Topics subscribed"
            );
            Ok(())
        }
        .await;

        observe("subscribe", result)
    }

    /// 取消订阅 topic
    pub async fn unsubscribe(&self, cmd: UnsubscribeCommand) -> AppResult<()> {
        let result: AppResult<()> = async {
            let (id, topics) = cmd.validate(&self.settings.limits)?;
            let removed = self.bounded(self.repo.unsubscribe(&id, &topics)).await?;

            match (removed, self.settings.unknown_unsubscribe) {
                (Some(removed), _) => {
                    debug!(
                        installation_id = %id,
                        requested = topics.len(),
                        removed,
                        "Topics unsubscribed"
                    );
                    Ok(())
                }
                (None, UnknownInstallationPolicy::Ignore) => {
                    debug!(installation_id = %id, "Unsubscribe of unknown installation ignored");
                    Ok(())
                }
                (None, UnknownInstallationPolicy::NotFound) => {
                    Err(RegistryError::InstallationNotFound.into())
                }
            }
        }
        .await;

        observe("unsubscribe", result)
    }

    /// 查询 installation 及其订阅
    pub async fn get(&self, query: GetInstallationQuery) -> AppResult<InstallationView> {
        let result: AppResult<InstallationView> = async {
            let id = query.validate(&self.settings.limits)?;
            let view = self
                .bounded(self.repo.find_by_id(&id))
                .await?
                .ok_or(RegistryError::InstallationNotFound)?;
            Ok(view)
        }
        .await;

        observe("get", result)
    }

    /// 列出订阅了 topic 的 installation，未知 topic 返回空列表
    pub async fn list_subscribers(
        &self,
        query: ListSubscribersQuery,
    ) -> AppResult<Vec<Installation>> {
        let result: AppResult<Vec<Installation>> = async {
            let topic = query.validate(&self.settings.limits)?;
            self.bounded(self.repo.list_subscribers(&topic)).await
        }
        .await;

        observe("list_subscribers", result)
    }

    /// 超时后丢弃存储调用的 future，PostgreSQL 事务随之回滚
    async fn bounded<T>(&self, operation: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        let timeout = self.settings.operation_timeout;
        match tokio::time::timeout(timeout, operation).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout(timeout.as_millis() as u64).into()),
        }
    }
}

fn observe<T>(operation: &'static str, result: AppResult<T>) -> AppResult<T> {
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    counter!("registry_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    result
}
