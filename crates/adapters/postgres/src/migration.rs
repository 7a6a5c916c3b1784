//! PostgreSQL 迁移管理模块
//!
//! 按版本号顺序执行内置的 SQL 迁移，并在迁移表中记录校验和

use notify_errors::{AppError, AppResult};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use tracing::{info, warn};

/// 多副本同时启动时串行化迁移用的 advisory lock key
const MIGRATION_LOCK_KEY: i64 = 0x6e6f_7469_6679;

/// 迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    /// 可以包含多条语句
    pub up_sql: String,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = checksum(&up_sql);
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }
}

fn checksum(sql: &str) -> String {
    hex::encode(Sha256::digest(sql.as_bytes()))
}

/// 迁移结果
#[derive(Debug, Default, Clone)]
pub struct MigrationResult {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
    table_name: String,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            table_name: "_migrations".to_string(),
        }
    }

    /// 设置迁移表名
    pub fn with_table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = name.into();
        self
    }

    async fn init(&self) -> AppResult<()> {
        let create_sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#,
            self.table_name
        );

        sqlx::query(&create_sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;
        Ok(())
    }

    /// 获取已应用的迁移
    pub async fn applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {} ORDER BY version ASC",
            self.table_name
        );

        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))
    }

    /// 应用所有待处理的迁移
    ///
    /// 已应用迁移的校验和不一致时直接失败，不会继续执行后续版本
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        self.init().await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(MIGRATION_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to lock migrations: {}", e)))?;

        let sql = format!("SELECT version, checksum FROM {}", self.table_name);
        let applied: Vec<(i64, String)> = sqlx::query_as(&sql)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to get migrations: {}", e)))?;

        let mut result = MigrationResult::default();

        for migration in sorted(migrations) {
            if let Some((_, recorded)) = applied.iter().find(|(v, _)| *v == migration.version) {
                if *recorded != migration.checksum {
                    warn!(
                        version = migration.version,
                        name = %migration.name,
                        "Migration checksum mismatch"
                    );
                    return Err(AppError::internal(format!(
                        "Migration {} ({}) has been modified after it was applied",
                        migration.version, migration.name
                    )));
                }
                result.skipped.push(migration.version);
                continue;
            }

            sqlx::raw_sql(&migration.up_sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!(
                        "Failed to apply migration {}: {}",
                        migration.version, e
                    ))
                })?;

            let insert_sql = format!(
                "INSERT INTO {} (version, name, checksum) VALUES ($1, $2, $3)",
                self.table_name
            );
            sqlx::query(&insert_sql)
                .bind(migration.version)
                .bind(&migration.name)
                .bind(&migration.checksum)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

            info!(
                version = migration.version,
                name = %migration.name,
                "Migration applied"
            );
            result.applied.push(migration.version);
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migrations: {}", e)))?;

        Ok(result)
    }
}

fn sorted(migrations: &[Migration]) -> Vec<&Migration> {
    let mut sorted: Vec<_> = migrations.iter().collect();
    sorted.sort_by_key(|m| m.version);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable() {
        let a = Migration::new(1, "create", "CREATE TABLE t (id INT)");
        let b = Migration::new(1, "create", "CREATE TABLE t (id INT)");
        let c = Migration::new(1, "create", "CREATE TABLE t (id BIGINT)");
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
        assert_eq!(a.checksum.len(), 64);
    }

    #[test]
    fn test_sorted_by_version() {
        let migrations = vec![
            Migration::new(3, "c", "SELECT 3"),
            Migration::new(1, "a", "SELECT 1"),
            Migration::new(2, "b", "SELECT 2"),
        ];
        let versions: Vec<i64> = sorted(&migrations).iter().map(|m| m.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }
}
