//! Application state.

use std::sync::Arc;

use trimiq_db::Database;
use trimiq_ml::EmbeddingClient;

use crate::config::ApiConfig;
use crate::services::JobRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: Database,
    pub embeddings: EmbeddingClient,
    pub jobs: Arc<JobRegistry>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        if config.secret_key.is_empty() {
            anyhow::bail!("SECRET_KEY must be set");
        }

        let db = Database::open(&config.database_path)?;
        Self::build(config, db).await
    }

    /// Assemble state around an existing database handle (tests use an
    /// in-memory database here).
    pub async fn build(config: ApiConfig, db: Database) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(config.output_dir()).await?;
        tokio::fs::create_dir_all(config.data_dir.join("jobs")).await?;

        let embeddings = EmbeddingClient::new(&config.clip_service_url)?;

        Ok(Self {
            config,
            db,
            embeddings,
            jobs: Arc::new(JobRegistry::new()),
        })
    }
}
