//! 数据库迁移

use notify_adapter_postgres::{Migration, MigrationManager};
use notify_errors::AppResult;
use sqlx::PgPool;
use tracing::info;

const CREATE_REGISTRY_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS installations (
    installation_id BYTEA PRIMARY KEY,
    delivery_token BYTEA NOT NULL,
    delivery_kind SMALLINT NOT NULL DEFAULT 3,
    locale VARCHAR(64),
    app_version VARCHAR(64),
    registered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS subscriptions (
    installation_id BYTEA NOT NULL REFERENCES installations (installation_id) ON DELETE CASCADE,
    topic_id BYTEA NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (installation_id, topic_id)
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_topic_id ON subscriptions (topic_id);
"#;

/// 注册表的全部迁移
pub fn migrations() -> Vec<Migration> {
    vec![Migration::new(1, "create_registry_tables", CREATE_REGISTRY_TABLES)]
}

/// 启动时执行迁移
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let manager = MigrationManager::new(pool.clone());
    let result = manager.migrate(&migrations()).await?;

    let current = manager
        .applied_migrations()
        .await?
        .last()
        .map(|m| m.version)
        .unwrap_or_default();

    info!(
        applied = result.applied.len(),
        skipped = result.skipped.len(),
        schema_version = current,
        "Database migrations finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_unique() {
        let migrations = migrations();
        let mut versions: Vec<i64> = migrations.iter().map(|m| m.version).collect();
        versions.dedup();
        assert_eq!(versions.len(), migrations.len());
    }

    #[test]
    fn test_subscriptions_cascade_on_delete() {
        assert!(CREATE_REGISTRY_TABLES.contains("ON DELETE CASCADE"));
    }
}
