use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub segmentation: SegmentationConfig,
    pub ingest: IngestConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub connection_string: Option<String>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory the filesystem blob store writes into
    pub blob_root: String,
    /// URL prefix under which `blob_root` is served
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Blob uploads in flight per commit; 1 uploads strictly in order
    pub upload_concurrency: usize,
    pub default_color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Accepted bearer tokens. A list rather than a table: `config` lowercases table keys.
    pub tokens: Vec<TokenEntry>,
    /// Accept `dev:<user>` tokens. Development only.
    pub allow_dev_tokens: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub token: String,
    pub principal: String,
}

impl TokenEntry {
    pub fn new(token: impl Into<String>, principal: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            principal: principal.into(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3001,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            connection_string: None,
            max_connections: 20,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            blob_root: "./data/blobs".to_string(),
            public_base_url: "http://127.0.0.1:3001/media".to_string(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout_secs: 60,
            max_upload_bytes: 8 * 1024 * 1024,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_concurrency: 1,
            default_color: crate::model::UNKNOWN_COLOR.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional config file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        Self::load_with_file(config::File::with_name("config").required(false))
    }

    /// Same layering as `load`, reading the given config file
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        Self::load_with_file(config::File::from(path.as_ref()))
    }

    fn load_with_file<F>(file: F) -> anyhow::Result<Self>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let mut config = config::Config::builder();

        config = config.add_source(config::Config::try_from(&AppConfig::default())?);

        config = config.add_source(file);

        // e.g. WARDROBE_SEGMENTATION__BASE_URL
        config = config.add_source(
            config::Environment::with_prefix("WARDROBE")
                .prefix_separator("_")
                .separator("__"),
        );

        let config = config.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;
        Ok(app_config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.segmentation.timeout_secs == 0 {
            anyhow::bail!("segmentation.timeout_secs must be greater than zero");
        }
        if self.segmentation.max_upload_bytes == 0 {
            anyhow::bail!("segmentation.max_upload_bytes must be greater than zero");
        }
        if self.ingest.upload_concurrency == 0 {
            anyhow::bail!("ingest.upload_concurrency must be at least 1");
        }
        if let Some(entry) = self.auth.tokens.iter().find(|e| e.token.trim().is_empty()) {
            anyhow::bail!("auth.tokens entry for {} has an empty token", entry.principal);
        }
        Ok(())
    }

    /// Database URL from config, then `DATABASE_URL`; `None` means in-memory metadata
    pub fn database_url(&self) -> Option<String> {
        self.database
            .connection_string
            .clone()
            .filter(|url| !url.is_empty())
            .or_else(|| std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()))
    }

    /// Get the server bind address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Largest request body accepted; confirm payloads carry several base64 images
    pub fn body_limit(&self) -> usize {
        self.segmentation.max_upload_bytes.saturating_mul(4)
    }
}
