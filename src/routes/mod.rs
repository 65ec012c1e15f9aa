/**
 * Routes Module
 * API route handlers
 */

pub mod annonces;
pub mod drafts;
pub mod form;
pub mod health;
pub mod home;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::RepoError;

pub const NOT_FOUND_MESSAGE: &str = "Annonce introuvable";

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Flat-table acknowledgement: `{ok, id?, error?}`
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            id: None,
            error: None,
        }
    }

    pub fn created(id: i64) -> Self {
        Self {
            ok: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            ok: false,
            id: None,
            error: Some(NOT_FOUND_MESSAGE.to_string()),
        }
    }
}

/// Two-table acknowledgement: `{success, id?, error?}`
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuccessResponse {
    pub fn success() -> Self {
        Self {
            success: true,
            id: None,
            error: None,
        }
    }

    pub fn with_id(id: i64) -> Self {
        Self {
            success: true,
            id: Some(id),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: false,
            id: None,
            error: Some(NOT_FOUND_MESSAGE.to_string()),
        }
    }
}

/// 500 with a generic body; the cause goes to the log only.
pub fn internal_error(context: &str, err: impl std::fmt::Display) -> Response {
    tracing::error!(error = %err, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: context.to_string(),
            message: None,
        }),
    )
        .into_response()
}

/// Maps a repository failure: not-found is a soft 200, anything else a 500.
pub fn repo_failure<T: Serialize>(context: &str, err: RepoError, not_found: T) -> Response {
    match err {
        RepoError::NotFound => (StatusCode::OK, Json(not_found)).into_response(),
        other => internal_error(context, other),
    }
}
