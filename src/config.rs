use serde::{Deserialize, Serialize};
use tracing::{info, error, warn};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    // Cloud service identifiers
    #[serde(default = "default_service_name")]
    pub cloud_service_name: String,

    /// JWT secret key
    pub cloud_auth_jwt_secret: Option<String>,

    /// Database URL
    pub db_url: Option<String>,

    /// Base URL of the learning-session service
    pub app_service_url: Option<String>,

    /// Largest accepted document content, in bytes
    #[serde(default = "default_doc_max_content_bytes")]
    pub doc_max_content_bytes: usize,

    /// Lifetime of a document from creation
    #[serde(default = "default_doc_ttl_hours")]
    pub doc_ttl_hours: i64,

    /// Period of the expiration sweeper
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Per-topic broadcast buffer
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,

    /// How long session lookups are cached
    #[serde(default = "default_session_cache_ttl_secs")]
    pub session_cache_ttl_secs: u64,

    /// `last-write-wins` or `reject-stale`
    #[serde(default = "default_update_policy")]
    pub update_policy: String,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if std::path::Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy
        match envy::from_env::<Config>() {
            Ok(config) => {
                info!("✅ Configuration loaded successfully");
                Ok(config)
            }
            Err(e) => {
                error!("❌ Failed to load configuration: {}", e);
                Err(ConfigError::EnvError(e))
            }
        }
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Split `cors_origins` into trimmed, non-empty entries
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn doc_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.doc_ttl_hours)
    }

    /// Zero is not a valid period and falls back to the default
    pub fn sweep_interval(&self) -> std::time::Duration {
        if self.sweep_interval_secs == 0 {
            warn!("SWEEP_INTERVAL_SECS must be positive, using {}", default_sweep_interval_secs());
            return std::time::Duration::from_secs(default_sweep_interval_secs());
        }
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn session_cache_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            cors_origins: None,
            cloud_service_name: default_service_name(),
            cloud_auth_jwt_secret: None,
            db_url: None,
            app_service_url: None,
            doc_max_content_bytes: default_doc_max_content_bytes(),
            doc_ttl_hours: default_doc_ttl_hours(),
            sweep_interval_secs: default_sweep_interval_secs(),
            broadcast_capacity: default_broadcast_capacity(),
            session_cache_ttl_secs: default_session_cache_ttl_secs(),
            update_policy: default_update_policy(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_service_name() -> String {
    "session-doc".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_doc_max_content_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_doc_ttl_hours() -> i64 {
    24
}

fn default_sweep_interval_secs() -> u64 {
    60 * 60
}

fn default_broadcast_capacity() -> usize {
    256
}

fn default_session_cache_ttl_secs() -> u64 {
    60
}

fn default_update_policy() -> String {
    "last-write-wins".to_string()
}
