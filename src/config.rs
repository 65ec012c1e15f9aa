//! Application configuration, read from the environment (and `.env` via dotenvy).

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::db::DbConfig;

pub const DEFAULT_MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB
pub const DEFAULT_MAX_BODY_SIZE: usize = 64 * 1024 * 1024;

/// URL prefix under which uploaded images are served.
pub const PUBLIC_UPLOAD_PREFIX: &str = "/static/uploads";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Flat `annonces` table database.
    pub annonces_db: DbConfig,
    /// Drafts / published two-table database.
    pub drafts_db: DbConfig,
    pub upload_dir: PathBuf,
    pub max_image_size: usize,
    pub max_body_size: usize,
    pub allowed_origins: Option<Vec<String>>,
}

fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

impl AppConfig {
    pub fn from_env() -> Self {
        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().and_then(|s| {
            let origins: Vec<String> = s
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        });

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8000),
            annonces_db: DbConfig::from_env("ANNONCES_DATABASE_URL", "sqlite://annonces.db"),
            drafts_db: DbConfig::from_env("DRAFTS_DATABASE_URL", "sqlite://annonces_v2.db"),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static/uploads")),
            max_image_size: env_or("MAX_IMAGE_SIZE", DEFAULT_MAX_IMAGE_SIZE),
            max_body_size: env_or("MAX_BODY_SIZE", DEFAULT_MAX_BODY_SIZE),
            allowed_origins,
        }
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}
