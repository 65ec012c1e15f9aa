pub mod annonces;
pub mod drafts;
pub mod image_refs;
pub mod models;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    /// Reads the database url from `url_var`; pool sizing is shared by every database.
    pub fn from_env(url_var: &str, fallback_url: &str) -> Self {
        Self {
            url: std::env::var(url_var).unwrap_or_else(|_| fallback_url.to_string()),
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        }
    }

    #[cfg(test)]
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 300,
        }
    }
}

/// Errors surfaced by the repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("annonce introuvable")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),
}

pub async fn init_pool(config: &DbConfig) -> Result<SqlitePool, sqlx::Error> {
    tracing::info!(url = %config.url, "Initializing database connection pool...");

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(1800))
        .connect_with(options)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!(url = %config.url, "Database connection pool initialized successfully");

    Ok(pool)
}

pub async fn health_check(pool: &SqlitePool) -> Result<Duration, sqlx::Error> {
    let start = std::time::Instant::now();
    sqlx::query("SELECT 1").fetch_one(pool).await?;

    Ok(start.elapsed())
}

/// Schema of the flat-table database.
pub async fn run_annonces_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    tracing::info!("Running annonces migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annonces (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titre TEXT NOT NULL DEFAULT '',
            contenu TEXT NOT NULL DEFAULT '',
            adresse TEXT,
            youtube TEXT,
            images TEXT NOT NULL DEFAULT '',
            publiee INTEGER NOT NULL DEFAULT 0,
            epingle INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '',
            lieux TEXT NOT NULL DEFAULT '',
            adresses TEXT NOT NULL DEFAULT '',
            youtubes TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_annonces_publiee_order
            ON annonces(publiee, epingle DESC, id DESC)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Annonces migrations completed successfully");

    Ok(())
}

/// Schema of the two-table (drafts / published) database.
pub async fn run_drafts_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    tracing::info!("Running drafts migrations...");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annonces_creees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titre TEXT NOT NULL,
            contenu TEXT NOT NULL,
            images TEXT NOT NULL DEFAULT '[]',
            adresse TEXT,
            youtube TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS annonces_publiees (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            titre TEXT NOT NULL,
            contenu TEXT NOT NULL,
            images TEXT NOT NULL DEFAULT '[]',
            adresse TEXT,
            youtube TEXT,
            published_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS image_refs (
            path TEXT PRIMARY KEY,
            refs INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Drafts migrations completed successfully");

    Ok(())
}
