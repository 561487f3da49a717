use crate::config::{DatabaseConfig, StoreBackend};
use crate::db::repositories::{MemoryRegistrationStore, RegistrationStore, RegistrationsRepository};
use crate::error::Error;
use anyhow::Result;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod migrations;
pub mod models;
pub mod repositories;

/// Database service for handling connections and migrations
pub struct DatabaseService {
    pub pool: Arc<PgPool>,
}

impl DatabaseService {
    /// Create a new database service
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Initializing Database service");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url)
            .await
            .map_err(|e| Error::Database(format!("Failed to connect to database: {}", e)))?;

        info!("Connected to PostgreSQL database");

        let service = Self {
            pool: Arc::new(pool),
        };

        // Run migrations if configured
        if config.auto_migrate {
            service.run_migrations().await?;
        }

        Ok(service)
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        migrations::run_migrations(&self.pool)
            .await
            .map_err(|e| Error::Database(format!("Failed to run migrations: {}", e)))?;

        info!("Database migrations completed successfully");

        Ok(())
    }
}

/// Build the registration store selected by configuration
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn RegistrationStore>> {
    match config.backend {
        StoreBackend::Postgres => {
            let database = DatabaseService::new(config).await?;
            Ok(Arc::new(RegistrationsRepository::new(database.pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory registration store; data is lost on exit");
            Ok(Arc::new(MemoryRegistrationStore::new()))
        }
    }
}
