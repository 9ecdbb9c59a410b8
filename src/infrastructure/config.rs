use std::env;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    #[error("Invalid value for environment variable {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub database: DatabaseConfig,
    pub inference: InferenceConfig,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            host: optional("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", 5000)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            database: DatabaseConfig {
                host: optional("DB_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
                port: parse_or("DB_PORT", 3306)?,
                user: required("DB_USER")?,
                password: env::var("DB_PASSWORD").unwrap_or_default(),
                name: required("DB_NAME")?,
                max_connections: parse_or("DB_MAX_CONNECTIONS", 5)?,
            },
            inference: InferenceConfig {
                base_url: optional("HUGGINGFACE_API_URL")
                    .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
                api_key: optional("HUGGINGFACE_API_KEY"),
            },
        };

        info!(
            host = %config.host,
            port = config.port,
            db_host = %config.database.host,
            db_name = %config.database.name,
            inference_url = %config.inference.base_url,
            api_key_present = config.inference.api_key.is_some(),
            "Configuration loaded"
        );
        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

/// Unset and blank values are both treated as absent.
fn optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(key: &str) -> Result<String, ConfigError> {
    optional(key).ok_or_else(|| ConfigError::MissingVariable(key.to_string()))
}

fn parse_or<T: FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => {
            debug!(key = key, "Variable not set, using default");
            Ok(default)
        }
    }
}
