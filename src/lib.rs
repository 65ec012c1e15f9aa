//! Annonces back-office - library for app logic and testing

pub mod config;
pub mod db;
pub mod logging;
pub mod routes;
pub mod storage;

#[cfg(test)]
mod test_support;

use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use crate::config::{AppConfig, PUBLIC_UPLOAD_PREFIX};
use crate::storage::ImageStore;

/// Shared by every handler. Pools hand out one connection per call.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Flat `annonces` table.
    pub annonces: SqlitePool,
    /// `annonces_creees` / `annonces_publiees` tables.
    pub drafts: SqlitePool,
    pub images: ImageStore,
}

/// Configure CORS from ALLOWED_ORIGINS; any origin when unset.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST];

    let origins: Option<Vec<HeaderValue>> = config.allowed_origins.as_ref().map(|origins| {
        origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect()
    });

    match origins {
        Some(origins) if !origins.is_empty() => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([axum::http::header::CONTENT_TYPE])
            .allow_credentials(true),
        _ => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any),
    }
}

/// Create and configure the application router.
pub fn create_app(state: AppState, config: &AppConfig) -> Router {
    let cors = configure_cors(config);
    let uploads = ServeDir::new(state.images.root());

    Router::new()
        .route("/", get(routes::home::index))
        // Flat table
        .route(
            "/api/annonces",
            get(routes::annonces::list_annonces).post(routes::annonces::create_annonce),
        )
        .route("/api/annonces/{id}/publier", post(routes::annonces::publish_annonce))
        .route("/api/annonces/{id}/supprimer", post(routes::annonces::delete_annonce))
        .route("/api/annonces/{id}/edit", post(routes::annonces::edit_annonce))
        // Drafts / published tables
        .route(
            "/api/annonces_creees",
            get(routes::drafts::list_drafts).post(routes::drafts::create_draft),
        )
        .route("/api/annonces_creees/{id}/publish", post(routes::drafts::publish_draft))
        .route("/api/annonces_creees/{id}/delete", post(routes::drafts::delete_draft))
        .route("/api/annonces_creees/{id}/edit", post(routes::drafts::edit_draft))
        .route("/api/annonces_publiees", get(routes::drafts::list_published))
        .route(
            "/api/annonces_publiees/{id}/delete",
            post(routes::drafts::delete_published),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/database", get(routes::health::health_database))
        .route("/health/ready", get(routes::health::health_ready))
        .nest_service(PUBLIC_UPLOAD_PREFIX, uploads)
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Per-file cap is enforced while parsing
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_size))
        .layer(cors)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Held until shutdown
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = AppConfig::from_env();

    let annonces = match db::init_pool(&config.annonces_db).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open annonces database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_annonces_migrations(&annonces).await {
        tracing::error!("Failed to run annonces migrations: {}", e);
        std::process::exit(1);
    }

    let drafts = match db::init_pool(&config.drafts_db).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to open drafts database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_drafts_migrations(&drafts).await {
        tracing::error!("Failed to run drafts migrations: {}", e);
        std::process::exit(1);
    }

    let images = ImageStore::new(config.upload_dir.clone(), config.max_image_size);
    if let Err(e) = images.ensure_dir().await {
        tracing::error!("Failed to create upload directory {:?}: {}", config.upload_dir, e);
        std::process::exit(1);
    }

    let state = AppState {
        annonces,
        drafts,
        images,
    };
    let app = create_app(state, &config);

    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            tracing::error!("Invalid HOST/PORT configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
