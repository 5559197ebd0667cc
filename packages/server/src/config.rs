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
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// When both are set, an admin account is ensured at startup.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Filesystem root for stored blobs.
    pub root: PathBuf,
    /// Public URL prefix under which blobs are served back.
    pub public_base_url: String,
    pub max_blob_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    /// Empty key means the assistant endpoints report an upstream error.
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// Recipient of contact-form notification mails.
    pub notify_to: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default(
                "server.cors.allow_origins",
                vec!["http://localhost:5173".to_string()],
            )?
            .set_default("server.cors.max_age", 3600)?
            .set_default("storage.root", "./data/blobs")?
            .set_default(
                "storage.public_base_url",
                "http://127.0.0.1:3000/assets",
            )?
            .set_default("storage.max_blob_size", 16 * 1024 * 1024)?
            .set_default("ai.api_key", "")?
            .set_default("ai.model", "gemini-2.5-flash")?
            .set_default("ai.base_url", "https://generativelanguage.googleapis.com")?
            .set_default("mail.notify_to", "")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g. VITRINE__AUTH__JWT_SECRET)
            .add_source(Environment::with_prefix("VITRINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
