//! Configuration management

use serde::{Deserialize, Serialize};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/factura";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default database idle timeout in seconds (10 minutes).
pub const DEFAULT_DATABASE_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Default exchange-rate service base URL.
pub const DEFAULT_RATES_BASE_URL: &str = "https://api.frankfurter.app";

/// Default timeout for a single exchange-rate lookup, in seconds.
pub const DEFAULT_RATE_TIMEOUT_SECS: u64 = 10;

/// Default directory for generated report artifacts.
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Default cap on a single uploaded file, in bytes (20 MiB).
pub const DEFAULT_MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

/// Default cap on files per batch.
pub const DEFAULT_MAX_BATCH_FILES: usize = 50;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub extraction: ExtractionConfig,
    pub rates: RatesConfig,
    pub uploads: UploadConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

/// Document field-extraction service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub endpoint: String,
    pub api_key: String,
}

/// Exchange-rate service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Upload limits and report output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub reports_dir: String,
    pub max_file_bytes: usize,
    pub max_batch_files: usize,
}

impl UploadConfig {
    /// Request-body cap for a batch submission. A full batch of maximum-size
    /// files must fit, plus headroom for multipart boundaries and text
    /// fields, so per-file validation gets to report its own error instead of
    /// the body limit rejecting the request first.
    pub fn body_limit(&self) -> usize {
        self.max_file_bytes
            .saturating_mul(self.max_batch_files)
            .saturating_add(64 * 1024)
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("FACTURA_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("FACTURA_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("FACTURA_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
                idle_timeout_secs: std::env::var("DATABASE_IDLE_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_IDLE_TIMEOUT_SECS),
            },
            extraction: ExtractionConfig {
                endpoint: std::env::var("EXTRACTION_ENDPOINT").unwrap_or_default(),
                api_key: std::env::var("EXTRACTION_API_KEY").unwrap_or_default(),
            },
            rates: RatesConfig {
                base_url: std::env::var("RATES_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_RATES_BASE_URL.to_string()),
                timeout_secs: std::env::var("RATES_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_RATE_TIMEOUT_SECS),
            },
            uploads: UploadConfig {
                reports_dir: std::env::var("REPORTS_DIR")
                    .unwrap_or_else(|_| DEFAULT_REPORTS_DIR.to_string()),
                max_file_bytes: std::env::var("MAX_FILE_BYTES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_FILE_BYTES),
                max_batch_files: std::env::var("MAX_BATCH_FILES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_MAX_BATCH_FILES),
            },
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
                allow_credentials: std::env::var("CORS_ALLOW_CREDENTIALS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(true),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.rates.base_url.is_empty() {
            anyhow::bail!("Exchange-rate base URL cannot be empty");
        }

        if self.rates.timeout_secs == 0 {
            anyhow::bail!("Exchange-rate timeout must be greater than 0");
        }

        if self.uploads.max_batch_files == 0 {
            anyhow::bail!("max_batch_files must be greater than 0");
        }

        if self.extraction.endpoint.is_empty() {
            tracing::warn!("No extraction endpoint configured - uploads will fail at the extract stage");
        }

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                idle_timeout_secs: DEFAULT_DATABASE_IDLE_TIMEOUT_SECS,
            },
            extraction: ExtractionConfig {
                endpoint: String::new(),
                api_key: String::new(),
            },
            rates: RatesConfig {
                base_url: DEFAULT_RATES_BASE_URL.to_string(),
                timeout_secs: DEFAULT_RATE_TIMEOUT_SECS,
            },
            uploads: UploadConfig {
                reports_dir: DEFAULT_REPORTS_DIR.to_string(),
                max_file_bytes: DEFAULT_MAX_FILE_BYTES,
                max_batch_files: DEFAULT_MAX_BATCH_FILES,
            },
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: true,
            },
        }
    }
}
