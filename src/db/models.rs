//! Database Models - rows as stored by sqlx and their JSON shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Separator for the flat table's `images` column.
pub const IMAGE_SEPARATOR: char = ',';

// ============================================================================
// Flat table
// ============================================================================

/// Raw `annonces` row.
#[derive(Debug, Clone, FromRow)]
pub struct AnnonceRow {
    pub id: i64,
    pub titre: String,
    pub contenu: String,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub images: String,
    pub publiee: bool,
    pub epingle: bool,
    pub tags: String,
    pub lieux: String,
    pub adresses: String,
    pub youtubes: String,
}

/// Annonce as returned by `GET /api/annonces`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annonce {
    pub id: i64,
    pub titre: String,
    pub contenu: String,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub images: Vec<String>,
    pub publiee: bool,
    pub epingle: bool,
    pub tags: String,
    pub lieux: String,
    pub adresses: String,
    pub youtubes: String,
}

impl From<AnnonceRow> for Annonce {
    fn from(row: AnnonceRow) -> Self {
        Self {
            id: row.id,
            titre: row.titre,
            contenu: row.contenu,
            adresse: row.adresse,
            youtube: row.youtube,
            images: split_images(&row.images),
            publiee: row.publiee,
            epingle: row.epingle,
            tags: row.tags,
            lieux: row.lieux,
            adresses: row.adresses,
            youtubes: row.youtubes,
        }
    }
}

/// Editable fields of a flat annonce.
#[derive(Debug, Clone, Default)]
pub struct AnnonceFields {
    pub titre: String,
    pub contenu: String,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub epingle: bool,
    pub tags: String,
    pub lieux: String,
    pub adresses: String,
    pub youtubes: String,
}

pub fn join_images(images: &[String]) -> String {
    images.join(&IMAGE_SEPARATOR.to_string())
}

pub fn split_images(images: &str) -> Vec<String> {
    if images.is_empty() {
        return Vec::new();
    }
    images.split(IMAGE_SEPARATOR).map(str::to_string).collect()
}

// ============================================================================
// Two-table variant
// ============================================================================

/// Raw `annonces_creees` row.
#[derive(Debug, Clone, FromRow)]
pub struct DraftRow {
    pub id: i64,
    pub titre: String,
    pub contenu: String,
    pub images: String,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw `annonces_publiees` row.
#[derive(Debug, Clone, FromRow)]
pub struct PublishedRow {
    pub id: i64,
    pub titre: String,
    pub contenu: String,
    pub images: String,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Draft annonce (`GET /api/annonces_creees`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub id: i64,
    pub titre: String,
    pub contenu: String,
    pub images: Vec<String>,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DraftRow> for Draft {
    fn from(row: DraftRow) -> Self {
        Self {
            id: row.id,
            titre: row.titre,
            contenu: row.contenu,
            images: decode_image_list(&row.images),
            adresse: row.adresse,
            youtube: row.youtube,
            created_at: row.created_at,
        }
    }
}

/// Published annonce (`GET /api/annonces_publiees`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Published {
    pub id: i64,
    pub titre: String,
    pub contenu: String,
    pub images: Vec<String>,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub published_at: DateTime<Utc>,
}

impl From<PublishedRow> for Published {
    fn from(row: PublishedRow) -> Self {
        Self {
            id: row.id,
            titre: row.titre,
            contenu: row.contenu,
            images: decode_image_list(&row.images),
            adresse: row.adresse,
            youtube: row.youtube,
            published_at: row.published_at,
        }
    }
}

/// Editable fields of a draft.
#[derive(Debug, Clone, Default)]
pub struct DraftFields {
    pub titre: String,
    pub contenu: String,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
}

pub fn encode_image_list(images: &[String]) -> String {
    serde_json::to_string(images).unwrap_or_else(|_| "[]".to_string())
}

/// Unreadable lists decode as empty.
pub fn decode_image_list(images: &str) -> Vec<String> {
    match serde_json::from_str(images) {
        Ok(list) => list,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable image list, treating as empty");
            Vec::new()
        }
    }
}
