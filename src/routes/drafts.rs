/**
 * Drafts / Published Routes
 * Two-table API: drafts and published annonces in separate tables
 */
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::db::drafts::{self, Table};
use crate::routes::form::AnnonceForm;
use crate::routes::{internal_error, repo_failure, SuccessResponse};
use crate::AppState;

/// GET /api/annonces_creees
pub async fn list_drafts(State(state): State<AppState>) -> impl IntoResponse {
    match drafts::list_drafts(&state.drafts).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => internal_error("Failed to list drafts", e),
    }
}

/// GET /api/annonces_publiees
pub async fn list_published(State(state): State<AppState>) -> impl IntoResponse {
    match drafts::list_published(&state.drafts).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => internal_error("Failed to list published annonces", e),
    }
}

/// POST /api/annonces_creees - Create a draft
pub async fn create_draft(State(state): State<AppState>, multipart: Multipart) -> impl IntoResponse {
    let form = match AnnonceForm::parse(multipart, state.images.max_size()).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let fields = match form.draft_fields() {
        Ok(fields) => fields,
        Err(e) => return e.into_response(),
    };

    let images = match state.images.store_accepted(&form.images).await {
        Ok(urls) => urls,
        Err(e) => return internal_error("Failed to save images", e),
    };

    match drafts::create_draft(&state.drafts, &fields, &images).await {
        Ok(id) => {
            tracing::info!(id, titre = %fields.titre, images = images.len(), "draft created");
            (StatusCode::OK, Json(SuccessResponse::with_id(id))).into_response()
        }
        Err(e) => {
            state.images.discard(&images).await;
            internal_error("Failed to create draft", e)
        }
    }
}

/// POST /api/annonces_creees/{id}/publish - Move a draft to the published table.
/// The published annonce gets a new id, returned in the response.
pub async fn publish_draft(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    match drafts::publish(&state.drafts, id).await {
        Ok(published_id) => {
            tracing::info!(draft_id = id, published_id, "draft published");
            (StatusCode::OK, Json(SuccessResponse::with_id(published_id))).into_response()
        }
        Err(e) => repo_failure("Failed to publish draft", e, SuccessResponse::not_found()),
    }
}

async fn delete_from(state: &AppState, table: Table, id: i64) -> axum::response::Response {
    match drafts::delete(&state.drafts, table, id).await {
        Ok(released) => {
            state.images.discard(&released).await;
            tracing::info!(id, ?table, released = released.len(), "annonce deleted");
            (StatusCode::OK, Json(SuccessResponse::success())).into_response()
        }
        Err(e) => repo_failure("Failed to delete annonce", e, SuccessResponse::not_found()),
    }
}

/// POST /api/annonces_creees/{id}/delete - Delete a draft and its images
pub async fn delete_draft(State(state): State<AppState>, Path(id): Path<i64>) -> impl IntoResponse {
    delete_from(&state, Table::Drafts, id).await
}

/// POST /api/annonces_publiees/{id}/delete - Delete a published annonce and its images
pub async fn delete_published(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    delete_from(&state, Table::Published, id).await
}

/// POST /api/annonces_creees/{id}/edit - Overwrite text, keep `keep_images`, append uploads
pub async fn edit_draft(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> impl IntoResponse {
    let form = match AnnonceForm::parse(multipart, state.images.max_size()).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };
    let (fields, keep) = match form.draft_fields().and_then(|f| Ok((f, form.keep_list()?))) {
        Ok(parsed) => parsed,
        Err(e) => return e.into_response(),
    };

    let uploaded = match state.images.store_accepted(&form.images).await {
        Ok(urls) => urls,
        Err(e) => return internal_error("Failed to save images", e),
    };

    match drafts::edit_draft(&state.drafts, id, &fields, &keep, &uploaded).await {
        Ok(outcome) => {
            state.images.discard(&outcome.released).await;
            tracing::info!(
                id,
                images = outcome.images.len(),
                removed = outcome.released.len(),
                "draft edited"
            );
            (StatusCode::OK, Json(SuccessResponse::success())).into_response()
        }
        Err(e) => {
            state.images.discard(&uploaded).await;
            repo_failure("Failed to edit draft", e, SuccessResponse::not_found())
        }
    }
}
