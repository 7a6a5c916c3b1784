//! PostgreSQL installation 仓储
//!
//! 写操作在事务中先以 `FOR UPDATE` 锁住 installation 行，同一 ID 的操作按加锁顺序串行；
//! 删除依赖外键 `ON DELETE CASCADE` 一并清理订阅。

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notify_bootstrap::DbQueryTimer;
use notify_errors::{AppError, AppResult};
use sqlx::{FromRow, PgPool};

use crate::domain::{
    DeliveryKind, DeliveryToken, Installation, InstallationId, InstallationMetadata,
    InstallationRepository, InstallationView, Registration, TopicId,
};

const INSTALLATION_COLUMNS: &str =
    "installation_id, delivery_token, delivery_kind, locale, app_version, registered_at, updated_at";

/// 将 sqlx 错误转换为 AppError
fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::PoolTimedOut => AppError::timeout("Database connection pool timeout"),
        sqlx::Error::PoolClosed => AppError::internal("Database connection pool is closed"),
        _ => AppError::database(e.to_string()),
    }
}

/// 计时并记录查询结果
async fn timed<T>(
    operation: &'static str,
    table: &'static str,
    query: impl std::future::Future<Output = Result<T, sqlx::Error>>,
) -> AppResult<T> {
    let timer = DbQueryTimer::new(operation, table);
    let result = query.await;
    timer.finish(result.is_ok());
    result.map_err(map_sqlx_error)
}

#[derive(Debug, FromRow)]
struct InstallationRow {
    installation_id: Vec<u8>,
    delivery_token: Vec<u8>,
    delivery_kind: i16,
    locale: Option<String>,
    app_version: Option<String>,
    registered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InstallationRow {
    fn into_domain(self) -> Installation {
        Installation {
            id: InstallationId::new(self.installation_id),
            token: DeliveryToken::new(self.delivery_token),
            kind: DeliveryKind::from_code(self.delivery_kind),
            metadata: InstallationMetadata {
                locale: self.locale,
                app_version: self.app_version,
            },
            registered_at: self.registered_at,
            updated_at: self.updated_at,
        }
    }
}

fn topic_bytes(topics: &BTreeSet<TopicId>) -> Vec<Vec<u8>> {
    topics.iter().map(|t| t.as_bytes().to_vec()).collect()
}

pub struct PostgresInstallationRepository {
    pool: PgPool,
}

impl PostgresInstallationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 开启事务并锁住 installation 行；不存在时返回 None（事务随之回滚）
    async fn lock_installation(
        &self,
        id: &InstallationId,
    ) -> AppResult<Option<sqlx::Transaction<'static, sqlx::Postgres>>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let locked: Option<(i32,)> = timed(
            "lock",
            "installations",
            sqlx::query_as("SELECT 1 FROM installations WHERE installation_id = $1 FOR UPDATE")
                .bind(id.as_bytes())
                .fetch_optional(&mut *tx),
        )
        .await?;

        Ok(locked.map(|_| tx))
    }
}

#[async_trait]
impl InstallationRepository for PostgresInstallationRepository {
    async fn upsert(&self, registration: Registration) -> AppResult<Installation> {
        let sql = format!(
            r#"
            INSERT INTO installations
                (installation_id, delivery_token, delivery_kind, locale, app_version, registered_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
            ON CONFLICT (installation_id) DO UPDATE
            SET delivery_token = EXCLUDED.delivery_token,
                delivery_kind = EXCLUDED.delivery_kind,
                locale = EXCLUDED.locale,
                app_version = EXCLUDED.app_version,
                updated_at = NOW()
            RETURNING {}
            "#,
            INSTALLATION_COLUMNS
        );

        let row: InstallationRow = timed(
            "upsert",
            "installations",
            sqlx::query_as(&sql)
                .bind(registration.id.as_bytes())
                .bind(registration.token.as_bytes())
                .bind(registration.kind.code())
                .bind(&registration.metadata.locale)
                .bind(&registration.metadata.app_version)
                .fetch_one(&self.pool),
        )
        .await?;

        Ok(row.into_domain())
    }

    async fn delete(&self, id: &InstallationId) -> AppResult<bool> {
        let result = timed(
            "delete",
            "installations",
            sqlx::query("DELETE FROM installations WHERE installation_id = $1")
                .bind(id.as_bytes())
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn subscribe(
        &self,
        id: &InstallationId,
        topics: &BTreeSet<TopicId>,
    ) -> AppResult<Option<usize>> {
        let Some(mut tx) = self.lock_installation(id).await? else {
            return Ok(None);
        };

        let result = timed(
            "insert",
            "subscriptions",
            sqlx::query(
                r#"
                INSERT INTO subscriptions (installation_id, topic_id)
                SELECT $1, topic_id FROM UNNEST($2::bytea[]) AS t(topic_id)
                ON CONFLICT (installation_id, topic_id) DO NOTHING
                "#,
            )
            .bind(id.as_bytes())
            .bind(topic_bytes(topics))
            .execute(&mut *tx),
        )
        .await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Some(result.rows_affected() as usize))
    }

    async fn unsubscribe(
        &self,
        id: &InstallationId,
        topics: &BTreeSet<TopicId>,
    ) -> AppResult<Option<usize>> {
        let Some(mut tx) = self.lock_installation(id).await? else {
            return Ok(None);
        };

        let result = timed(
            "delete",
            "subscriptions",
            sqlx::query(
                "DELETE FROM subscriptions WHERE installation_id = $1 AND topic_id = ANY($2::bytea[])",
            )
            .bind(id.as_bytes())
            .bind(topic_bytes(topics))
            .execute(&mut *tx),
        )
        .await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Some(result.rows_affected() as usize))
    }

    async fn find_by_id(&self, id: &InstallationId) -> AppResult<Option<InstallationView>> {
        // 两次读取在同一个事务里，保证记录和订阅来自同一快照
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let sql = format!(
            "SELECT {} FROM installations WHERE installation_id = $1",
            INSTALLATION_COLUMNS
        );
        let row: Option<InstallationRow> = timed(
            "select",
            "installations",
            sqlx::query_as(&sql)
                .bind(id.as_bytes())
                .fetch_optional(&mut *tx),
        )
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let topics: Vec<(Vec<u8>,)> = timed(
            "select",
            "subscriptions",
            sqlx::query_as(
                "SELECT topic_id FROM subscriptions WHERE installation_id = $1 ORDER BY topic_id",
            )
            .bind(id.as_bytes())
            .fetch_all(&mut *tx),
        )
        .await?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(Some(InstallationView {
            installation: row.into_domain(),
            topics: topics.into_iter().map(|(t,)| TopicId::new(t)).collect(),
        }))
    }

    async fn list_subscribers(&self, topic: &TopicId) -> AppResult<Vec<Installation>> {
        let rows: Vec<InstallationRow> = timed(
            "select",
            "subscriptions",
            sqlx::query_as(
                r#"
                SELECT i.installation_id, i.delivery_token, i.delivery_kind, i.locale,
                       i.app_version, i.registered_at, i.updated_at
                FROM installations i
                JOIN subscriptions s ON s.installation_id = i.installation_id
                WHERE s.topic_id = $1
                ORDER BY i.installation_id
                "#,
            )
            .bind(topic.as_bytes())
            .fetch_all(&self.pool),
        )
        .await?;

        Ok(rows.into_iter().map(InstallationRow::into_domain).collect())
    }
}
