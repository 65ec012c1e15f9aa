/**
 * Annonces Routes
 * Flat-table API: one table, `publiee` / `epingle` flags
 */
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::{annonces, models::Annonce};
use crate::routes::form::AnnonceForm;
use crate::routes::{internal_error, repo_failure, OkResponse};
use crate::AppState;

/// Response for GET /api/annonces
#[derive(Debug, Serialize, Deserialize)]
pub struct AnnoncesResponse {
    pub creees: Vec<Annonce>,
    pub publiees: Vec<Annonce>,
}

/// GET /api/annonces - Drafts and published listings, pinned first then newest
pub async fn list_annonces(State(state): State<AppState>) -> impl IntoResponse {
    match annonces::list_all(&state.annonces).await {
        Ok(all) => {
            tracing::debug!(
                creees = all.creees.len(),
                publiees = all.publiees.len(),
                "listed annonces"
            );
            (
                StatusCode::OK,
                Json(AnnoncesResponse {
                    creees: all.creees,
                    publiees: all.publiees,
                }),
            )
                .into_response()
        }
        Err(e) => internal_error("Failed to list annonces", e),
    }
}

/// POST /api/annonces - Create a draft from a multipart form
pub async fn create_annonce(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let form = match AnnonceForm::parse(multipart, state.images.max_size()).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let fields = match form.annonce_fields() {
        Ok(fields) => fields,
        Err(e) => return e.into_response(),
    };

    let images = match state.images.store_accepted(&form.images).await {
        Ok(urls) => urls,
        Err(e) => return internal_error("Failed to save images", e),
    };

    match annonces::create(&state.annonces, &fields, &images).await {
        Ok(id) => {
            tracing::info!(id, titre = %fields.titre, images = images.len(), "annonce created");
            (StatusCode::OK, Json(OkResponse::created(id))).into_response()
        }
        Err(e) => {
            state.images.discard(&images).await;
            internal_error("Failed to create annonce", e)
        }
    }
}

/// POST /api/annonces/{id}/publier - Flip to published, same id
pub async fn publish_annonce(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match annonces::publish(&state.annonces, id).await {
        Ok(()) => {
            tracing::info!(id, "annonce published");
            (StatusCode::OK, Json(OkResponse::ok())).into_response()
        }
        Err(e) => repo_failure("Failed to publish annonce", e, OkResponse::not_found()),
    }
}

/// POST /api/annonces/{id}/supprimer - Delete the row; image files are kept
pub async fn delete_annonce(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match annonces::delete(&state.annonces, id).await {
        Ok(()) => {
            tracing::info!(id, "annonce deleted");
            (StatusCode::OK, Json(OkResponse::ok())).into_response()
        }
        Err(e) => repo_failure("Failed to delete annonce", e, OkResponse::not_found()),
    }
}

/// POST /api/annonces/{id}/edit - Full overwrite; images become this request's uploads
pub async fn edit_annonce(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> impl IntoResponse {
    let form = match AnnonceForm::parse(multipart, state.images.max_size()).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let fields = match form.annonce_fields() {
        Ok(fields) => fields,
        Err(e) => return e.into_response(),
    };

    let images = match state.images.store_accepted(&form.images).await {
        Ok(urls) => urls,
        Err(e) => return internal_error("Failed to save images", e),
    };

    match annonces::edit(&state.annonces, id, &fields, &images).await {
        Ok(()) => {
            tracing::info!(id, images = images.len(), "annonce edited");
            (StatusCode::OK, Json(OkResponse::ok())).into_response()
        }
        Err(e) => {
            state.images.discard(&images).await;
            repo_failure("Failed to edit annonce", e, OkResponse::not_found())
        }
    }
}
