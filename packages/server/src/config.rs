use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// `postgres://…` in production, `sqlite://…?mode=rwc` for local runs.
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider that issues tokens.
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded files.
    pub root: PathBuf,
    /// Prefix of the `fileUrl` handed out for stored files. The file's hash
    /// is appended after a `/`.
    pub public_url: String,
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
}

impl StorageConfig {
    pub fn file_url(&self, hash: &str) -> String {
        format!("{}/{}", self.public_url.trim_end_matches('/'), hash)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://assetvault.db?mode=rwc")?
            .set_default("storage.root", "./data/files")?
            .set_default("storage.public_url", "/api/v1/files")?
            .set_default("storage.max_file_size", 256 * 1024 * 1024)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ASSETVAULT__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("ASSETVAULT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
