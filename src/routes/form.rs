//! Multipart annonce form, parsed once at the boundary.

use axum::{
    body::Bytes,
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::db::models::{AnnonceFields, DraftFields};
use crate::routes::ErrorResponse;
use crate::storage::UploadedFile;

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid multipart data: {0}")]
    Multipart(#[from] MultipartError),
    #[error("field required: {0}")]
    MissingField(&'static str),
    #[error("keep_images must be a JSON array of strings: {0}")]
    InvalidKeepList(#[from] serde_json::Error),
}

impl IntoResponse for FormError {
    fn into_response(self) -> Response {
        let status = match &self {
            FormError::Multipart(_) => StatusCode::BAD_REQUEST,
            FormError::MissingField(_) | FormError::InvalidKeepList(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        };
        tracing::warn!(error = %self, "rejected annonce form");
        (
            status,
            Json(ErrorResponse {
                error: "Invalid form".to_string(),
                message: Some(self.to_string()),
            }),
        )
            .into_response()
    }
}

/// Every field either variant accepts. Unknown parts are ignored.
#[derive(Debug, Default)]
pub struct AnnonceForm {
    pub titre: Option<String>,
    pub contenu: Option<String>,
    pub adresse: Option<String>,
    pub youtube: Option<String>,
    pub epingle: Option<String>,
    pub tags: Option<String>,
    pub lieux: Option<String>,
    pub adresses: Option<String>,
    pub youtubes: Option<String>,
    pub keep_images: Option<String>,
    pub images: Vec<UploadedFile>,
}

/// Reads a file part, buffering at most `max_size` bytes but counting all of them.
async fn read_file(
    field: &mut axum::extract::multipart::Field<'_>,
    max_size: usize,
) -> Result<(Bytes, usize), MultipartError> {
    let mut buf = Vec::new();
    let mut size = 0usize;

    while let Some(chunk) = field.chunk().await? {
        size += chunk.len();
        if size <= max_size {
            buf.extend_from_slice(&chunk);
        } else if !buf.is_empty() {
            buf = Vec::new();
        }
    }

    Ok((Bytes::from(buf), size))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AnnonceForm {
    pub async fn parse(mut multipart: Multipart, max_file_size: usize) -> Result<Self, FormError> {
        let mut form = AnnonceForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();

            if name == "images" || name == "images[]" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let (data, size) = read_file(&mut field, max_file_size).await?;
                form.images.push(UploadedFile {
                    file_name,
                    content_type,
                    data,
                    size,
                });
                continue;
            }

            let value = field.text().await?;
            let slot = match name.as_str() {
                "titre" => &mut form.titre,
                "contenu" => &mut form.contenu,
                "adresse" => &mut form.adresse,
                "youtube" => &mut form.youtube,
                "epingle" => &mut form.epingle,
                "tags" => &mut form.tags,
                "lieux" => &mut form.lieux,
                "adresses" => &mut form.adresses,
                "youtubes" => &mut form.youtubes,
                "keep_images" => &mut form.keep_images,
                other => {
                    tracing::debug!(field = %other, "ignoring unknown form field");
                    continue;
                }
            };
            *slot = Some(value);
        }

        tracing::debug!(
            titre = ?form.titre,
            images = form.images.len(),
            "parsed annonce form"
        );

        Ok(form)
    }

    /// Empty counts as missing.
    fn required(value: &Option<String>, name: &'static str) -> Result<String, FormError> {
        value
            .clone()
            .filter(|v| !v.is_empty())
            .ok_or(FormError::MissingField(name))
    }

    /// Checkbox semantics: only "on" (or an explicit true) pins.
    pub fn is_pinned(&self) -> bool {
        matches!(
            self.epingle.as_deref().map(str::trim),
            Some("on") | Some("true") | Some("1")
        )
    }

    pub fn annonce_fields(&self) -> Result<AnnonceFields, FormError> {
        Ok(AnnonceFields {
            titre: Self::required(&self.titre, "titre")?,
            contenu: Self::required(&self.contenu, "contenu")?,
            adresse: non_blank(self.adresse.clone()),
            youtube: non_blank(self.youtube.clone()),
            epingle: self.is_pinned(),
            tags: self.tags.clone().unwrap_or_default(),
            lieux: self.lieux.clone().unwrap_or_default(),
            adresses: self.adresses.clone().unwrap_or_default(),
            youtubes: self.youtubes.clone().unwrap_or_default(),
        })
    }

    pub fn draft_fields(&self) -> Result<DraftFields, FormError> {
        Ok(DraftFields {
            titre: Self::required(&self.titre, "titre")?,
            contenu: Self::required(&self.contenu, "contenu")?,
            adresse: non_blank(self.adresse.clone()),
            youtube: non_blank(self.youtube.clone()),
        })
    }

    /// `keep_images` as a list; absent or blank keeps nothing.
    pub fn keep_list(&self) -> Result<Vec<String>, FormError> {
        match self.keep_images.as_deref().map(str::trim) {
            None | Some("") => Ok(Vec::new()),
            Some(raw) => Ok(serde_json::from_str(raw)?),
        }
    }
}
