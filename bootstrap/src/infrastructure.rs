//! 基础设施资源管理
//!
//! 根据存储后端配置创建服务需要的外部资源

use std::time::Duration;

use notify_adapter_postgres::{PoolStatus, PostgresConfig, create_pool};
use notify_config::{AppConfig, StorageBackend};
use notify_errors::{AppError, AppResult};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use tracing::info;

use crate::retry::{RetryConfig, with_retry};

/// 基础设施资源容器
///
/// 由 bootstrap 统一初始化，克隆开销很小（连接池内部是引用计数）
#[derive(Clone)]
pub struct Infrastructure {
    config: AppConfig,
    /// 仅在 `storage.backend = "postgres"` 时存在
    postgres_pool: Option<PgPool>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（数据库连接带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let postgres_pool = match config.storage.backend {
            StorageBackend::Memory => {
                info!("In-memory storage selected, PostgreSQL is not used");
                None
            }
            StorageBackend::Postgres => {
                let database = config.database.as_ref().ok_or_else(|| {
                    AppError::internal("PostgreSQL backend selected without [database] config")
                })?;

                let pg_config = PostgresConfig::new(database.url.expose_secret())
                    .with_max_connections(database.max_connections)
                    .with_acquire_timeout(Duration::from_millis(
                        config.registry.operation_timeout_ms,
                    ));

                let pool = with_retry(&RetryConfig::default(), "PostgreSQL connection", || {
                    let cfg = pg_config.clone();
                    async move { create_pool(&cfg).await }
                })
                .await?;

                info!(
                    max_connections = database.max_connections,
                    "PostgreSQL connection pool created"
                );
                Some(pool)
            }
        };

        Ok(Self {
            config,
            postgres_pool,
        })
    }

    /// 应用配置
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// PostgreSQL 连接池（内存后端时为 None）
    pub fn postgres_pool(&self) -> Option<PgPool> {
        self.postgres_pool.clone()
    }

    pub fn pool_status(&self) -> Option<PoolStatus> {
        self.postgres_pool.as_ref().map(PoolStatus::of)
    }
}
