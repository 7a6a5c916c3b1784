//! Notification Registry 服务入口

use std::sync::Arc;

use notification_registry::api::NotificationsServiceImpl;
use notification_registry::api::proto::FILE_DESCRIPTOR_SET;
use notification_registry::api::proto::notifications::notifications_server::NotificationsServer;
use notification_registry::application::RegistryHandler;
use notification_registry::config::RegistrySettings;
use notification_registry::domain::InstallationRepository;
use notification_registry::infrastructure::persistence::{
    InMemoryInstallationRepository, PostgresInstallationRepository, run_migrations,
};
use notify_bootstrap::{Infrastructure, build_reflection, run_server, tracing_interceptor};
use notify_errors::AppError;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    run_server("config", |infra: Infrastructure, mut server| async move {
        info!("Initializing Notification Registry...");

        let settings = RegistrySettings::from(&infra.config().registry);

        let repo: Arc<dyn InstallationRepository> = match infra.postgres_pool() {
            Some(pool) => {
                run_migrations(&pool).await?;
                Arc::new(PostgresInstallationRepository::new(pool))
            }
            None => Arc::new(InMemoryInstallationRepository::new()),
        };

        info!(
            operation_timeout_ms = settings.operation_timeout.as_millis() as u64,
            unknown_unsubscribe = ?settings.unknown_unsubscribe,
            "Registry initialized"
        );

        let handler = Arc::new(RegistryHandler::new(repo, settings));
        let service = NotificationsServiceImpl::new(handler);

        let reflection = build_reflection(vec![FILE_DESCRIPTOR_SET])
            .map_err(|e| AppError::internal(format!("Failed to build reflection service: {}", e)))?;

        Ok(server
            .add_service(NotificationsServer::with_interceptor(
                service,
                tracing_interceptor,
            ))
            .add_service(reflection))
    })
    .await
}
