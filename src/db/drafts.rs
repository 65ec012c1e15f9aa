//! Two-table variant: drafts (`annonces_creees`) and published listings
//! (`annonces_publiees`) live in separate tables with their own ids.
//!
//! Every operation that touches more than one statement runs in a single
//! transaction whose first statement is a write, so concurrent callers queue
//! on the SQLite write lock (busy timeout) instead of failing to upgrade a
//! read. Operations that drop image references return the released paths so
//! the caller can delete the files once the transaction committed.

use chrono::Utc;
use sqlx::SqlitePool;

use super::image_refs;
use super::models::{
    decode_image_list, encode_image_list, Draft, DraftFields, DraftRow, Published, PublishedRow,
};
use super::RepoError;

/// Result of a draft edit.
#[derive(Debug, Default)]
pub struct EditOutcome {
    /// Stored image list after the edit.
    pub images: Vec<String>,
    /// Paths no row references any more.
    pub released: Vec<String>,
}

pub async fn list_drafts(pool: &SqlitePool) -> Result<Vec<Draft>, RepoError> {
    let rows = sqlx::query_as::<_, DraftRow>(
        "SELECT id, titre, contenu, images, adresse, youtube, created_at FROM annonces_creees ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Draft::from).collect())
}

pub async fn list_published(pool: &SqlitePool) -> Result<Vec<Published>, RepoError> {
    let rows = sqlx::query_as::<_, PublishedRow>(
        "SELECT id, titre, contenu, images, adresse, youtube, published_at FROM annonces_publiees ORDER BY id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Published::from).collect())
}

#[cfg(test)]
pub async fn get_draft(pool: &SqlitePool, id: i64) -> Result<Draft, RepoError> {
    sqlx::query_as::<_, DraftRow>(
        "SELECT id, titre, contenu, images, adresse, youtube, created_at FROM annonces_creees WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(Draft::from)
    .ok_or(RepoError::NotFound)
}

#[cfg(test)]
pub async fn get_published(pool: &SqlitePool, id: i64) -> Result<Published, RepoError> {
    sqlx::query_as::<_, PublishedRow>(
        "SELECT id, titre, contenu, images, adresse, youtube, published_at FROM annonces_publiees WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .map(Published::from)
    .ok_or(RepoError::NotFound)
}

pub async fn create_draft(
    pool: &SqlitePool,
    fields: &DraftFields,
    images: &[String],
) -> Result<i64, RepoError> {
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        r#"
        INSERT INTO annonces_creees (titre, contenu, images, adresse, youtube, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fields.titre)
    .bind(&fields.contenu)
    .bind(encode_image_list(images))
    .bind(&fields.adresse)
    .bind(&fields.youtube)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    image_refs::attach(&mut *tx, images).await?;
    tx.commit().await?;

    Ok(result.last_insert_rowid())
}

/// Moves a draft into the published table and returns the new published id.
/// Image references move with the row, so no file is released.
pub async fn publish(pool: &SqlitePool, draft_id: i64) -> Result<i64, RepoError> {
    let mut tx = pool.begin().await?;

    let draft = sqlx::query_as::<_, DraftRow>(
        r#"
        DELETE FROM annonces_creees WHERE id = ?
        RETURNING id, titre, contenu, images, adresse, youtube, created_at
        "#,
    )
    .bind(draft_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepoError::NotFound)?;

    let result = sqlx::query(
        r#"
        INSERT INTO annonces_publiees (titre, contenu, images, adresse, youtube, published_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&draft.titre)
    .bind(&draft.contenu)
    .bind(&draft.images)
    .bind(&draft.adresse)
    .bind(&draft.youtube)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(result.last_insert_rowid())
}

/// Table a deletion targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Drafts,
    Published,
}

impl Table {
    fn name(self) -> &'static str {
        match self {
            Table::Drafts => "annonces_creees",
            Table::Published => "annonces_publiees",
        }
    }
}

/// Deletes a row and returns the image paths it released.
pub async fn delete(pool: &SqlitePool, table: Table, id: i64) -> Result<Vec<String>, RepoError> {
    let mut tx = pool.begin().await?;

    let images: (String,) = sqlx::query_as(&format!(
        "DELETE FROM {} WHERE id = ? RETURNING images",
        table.name()
    ))
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepoError::NotFound)?;

    let released = image_refs::detach(&mut *tx, &decode_image_list(&images.0)).await?;
    tx.commit().await?;

    Ok(released)
}

/// Overwrites the text fields, keeps the stored images named in `keep`
/// (in stored order), then appends `uploaded`.
pub async fn edit_draft(
    pool: &SqlitePool,
    id: i64,
    fields: &DraftFields,
    keep: &[String],
    uploaded: &[String],
) -> Result<EditOutcome, RepoError> {
    let mut tx = pool.begin().await?;

    // The images column is untouched here, so RETURNING yields the stored list.
    let stored: (String,) = sqlx::query_as(
        r#"
        UPDATE annonces_creees
        SET titre = ?, contenu = ?, adresse = ?, youtube = ?
        WHERE id = ?
        RETURNING images
        "#,
    )
    .bind(&fields.titre)
    .bind(&fields.contenu)
    .bind(&fields.adresse)
    .bind(&fields.youtube)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(RepoError::NotFound)?;

    let (kept, dropped): (Vec<String>, Vec<String>) = decode_image_list(&stored.0)
        .into_iter()
        .partition(|path| keep.contains(path));

    let mut images = kept;
    images.extend(uploaded.iter().cloned());

    sqlx::query("UPDATE annonces_creees SET images = ? WHERE id = ?")
        .bind(encode_image_list(&images))
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let released = image_refs::detach(&mut *tx, &dropped).await?;
    image_refs::attach(&mut *tx, uploaded).await?;
    tx.commit().await?;

    Ok(EditOutcome { images, released })
}
