use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use config::{Config as ConfigLib, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use crate::utils::error::{Result, FaceError};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub crypto: CryptoConfig,
    pub enrollment: EnrollmentConfig,
    pub matching: MatchingConfig,
    pub extractor: ExtractorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    pub cors_allowed_origins: Vec<String>,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CryptoConfig {
    pub key_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnrollmentConfig {
    pub min_images: usize,
    pub max_images: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    pub tolerance: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractorConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl ExtractorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<String>,
}

impl Config {
    pub fn new() -> Result<Self> {
        let config = Self::defaults()?
            // Load from config file
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))

            // Override with environment variables (e.g., APP__SERVER__PORT)
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )

            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Built-in defaults only, no files or environment.
    pub fn default_config() -> Result<Self> {
        let config: Self = Self::defaults()?.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = ConfigLib::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("server.max_request_size", 10_485_760)?  // 10MB
            .set_default("server.cors_allowed_origins", vec!["*".to_string()])?
            .set_default("storage.backend", default_backend())?
            .set_default("storage.path", "models/faces")?
            .set_default("crypto.key_file", "secret.key")?
            .set_default("enrollment.min_images", 1)?
            .set_default("enrollment.max_images", 5)?
            .set_default("matching.tolerance", 0.6)?
            .set_default("extractor.endpoint", "http://127.0.0.1:5002/descriptors")?
            .set_default("extractor.timeout_secs", 30)?
            .set_default("logging.level", "info")?;

        Ok(builder)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(FaceError::Config("Invalid port number".into()));
        }
        if self.server.max_request_size == 0 {
            return Err(FaceError::Config("max_request_size must be greater than 0".into()));
        }

        if self.storage.path.trim().is_empty() {
            return Err(FaceError::Config("storage path must be set".into()));
        }
        #[cfg(not(feature = "rocksdb"))]
        if self.storage.backend == StorageBackend::Rocksdb {
            return Err(FaceError::Config(
                "rocksdb backend requested but the rocksdb feature is disabled".into(),
            ));
        }

        if self.enrollment.min_images == 0 {
            return Err(FaceError::Config("min_images must be at least 1".into()));
        }
        if self.enrollment.max_images < self.enrollment.min_images {
            return Err(FaceError::Config("max_images must not be less than min_images".into()));
        }

        if !(self.matching.tolerance > 0.0) {
            return Err(FaceError::Config("matching tolerance must be positive".into()));
        }

        if self.extractor.endpoint.trim().is_empty() {
            return Err(FaceError::Config("extractor endpoint must be set".into()));
        }

        Ok(())
    }
}

fn default_backend() -> &'static str {
    if cfg!(feature = "rocksdb") {
        "rocksdb"
    } else {
        "file"
    }
}

impl From<ConfigError> for FaceError {
    fn from(error: ConfigError) -> Self {
        FaceError::Config(error.to_string())
    }
}
