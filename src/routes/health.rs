/**
 * Health Routes
 * Endpoints for checking backend health status
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::time::Instant;

use crate::AppState;

// Track server start time for uptime calculation
lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Initialize the server start time
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCheck {
    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// One check per database
#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseChecks {
    pub annonces: ServiceCheck,
    pub drafts: ServiceCheck,
}

/// Ready check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
    pub checks: DatabaseChecks,
}

/// Simple health response
#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

async fn check(pool: &SqlitePool) -> ServiceCheck {
    match crate::db::health_check(pool).await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(e) => ServiceCheck {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(e.to_string()),
        },
    }
}

async fn check_all(state: &AppState) -> DatabaseChecks {
    DatabaseChecks {
        annonces: check(&state.annonces).await,
        drafts: check(&state.drafts).await,
    }
}

/// GET /health - Simple health ping
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/database - Database health checks
pub async fn health_database(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(check_all(&state).await))
}

/// GET /health/ready - Readiness check, 503 until both databases answer
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let checks = check_all(&state).await;
    let is_ready = checks.annonces.is_healthy() && checks.drafts.is_healthy();

    let response = ReadyResponse {
        status: if is_ready {
            "ready".to_string()
        } else {
            "not ready".to_string()
        },
        timestamp: Utc::now(),
        uptime: Some(SERVER_START.elapsed().as_secs()),
        checks,
    };

    let status = if is_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[test]
    fn test_service_check_has_required_fields() {
        let check = ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(10),
            error: None,
        };
        let json = serde_json::to_string(&check).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("responseTime"));
        assert!(!json.contains("error"));
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        let app = test_support::app().await;
        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        let body: SimpleHealthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_database_reports_both_databases() {
        let app = test_support::app().await;
        let (status, body) = app.get("/health/database").await;
        assert_eq!(status, StatusCode::OK);
        let checks: DatabaseChecks = serde_json::from_slice(&body).unwrap();
        assert!(checks.annonces.is_healthy());
        assert!(checks.drafts.is_healthy());
    }

    #[tokio::test]
    async fn test_health_ready_returns_ready() {
        init_start_time();
        let app = test_support::app().await;
        let (status, body) = app.get("/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        let body: ReadyResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "ready");
        assert!(body.uptime.is_some());
    }

    #[tokio::test]
    async fn test_health_ready_not_ready_when_pool_closed() {
        let app = test_support::app().await;
        app.state.drafts.close().await;
        let (status, body) = app.get("/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let body: ReadyResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.status, "not ready");
        assert!(!body.checks.drafts.is_healthy());
    }
}
