//! 持久化实现

mod memory_repository;
mod migrations;
mod postgres_repository;

pub use memory_repository::InMemoryInstallationRepository;
pub use migrations::{migrations, run_migrations};
pub use postgres_repository::PostgresInstallationRepository;
