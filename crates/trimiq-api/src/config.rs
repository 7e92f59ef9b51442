//! API configuration.

use std::path::PathBuf;

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size (uploads included)
    pub max_body_size: usize,
    /// Environment (development/production)
    pub environment: String,
    /// JWT signing secret (required at startup)
    pub secret_key: String,
    /// Issued token lifetime in hours
    pub token_ttl_hours: i64,
    /// SQLite database path
    pub database_path: PathBuf,
    /// Root directory for uploads and rendered outputs
    pub data_dir: PathBuf,
    /// Whisper model name passed to the CLI
    pub whisper_model: String,
    /// Base URL of the CLIP embedding service
    pub clip_service_url: String,
    /// Hours a rendered output survives before the cleanup timer deletes it
    pub auto_delete_hours: u64,
    /// Billing rate in currency units per processed minute
    pub billing_rate_per_minute: f64,
    /// Maximum candidate clips accepted per request
    pub max_clips: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 512 * 1024 * 1024, // 512MB, uploads are large
            environment: "development".to_string(),
            secret_key: String::new(),
            token_ttl_hours: 24,
            database_path: PathBuf::from("trimiq.db"),
            data_dir: PathBuf::from("data"),
            whisper_model: "base".to_string(),
            clip_service_url: "http://localhost:8100".to_string(),
            auto_delete_hours: 24,
            billing_rate_per_minute: 1.0,
            max_clips: 32,
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
            secret_key: std::env::var("SECRET_KEY").unwrap_or_default(),
            token_ttl_hours: std::env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.token_ttl_hours),
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            whisper_model: std::env::var("WHISPER_MODEL").unwrap_or(defaults.whisper_model),
            clip_service_url: std::env::var("CLIP_SERVICE_URL")
                .unwrap_or(defaults.clip_service_url),
            auto_delete_hours: std::env::var("AUTO_DELETE_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.auto_delete_hours),
            billing_rate_per_minute: std::env::var("BILLING_RATE_PER_MINUTE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.billing_rate_per_minute),
            max_clips: std::env::var("MAX_CLIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_clips),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Directory rendered outputs are written into.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join("output")
    }

    /// Scratch directory for a job's uploaded files.
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.data_dir.join("jobs").join(job_id)
    }
}
