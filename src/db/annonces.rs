//! Flat `annonces` table: drafts and published listings share one table,
//! separated by the `publiee` flag.

use sqlx::SqlitePool;

use super::models::{join_images, Annonce, AnnonceFields, AnnonceRow};
use super::RepoError;

const SELECT_COLUMNS: &str = "SELECT id, titre, contenu, adresse, youtube, images, publiee, epingle, \
     tags, lieux, adresses, youtubes FROM annonces";

/// Listings split by state, each ordered pinned first then newest first.
#[derive(Debug, Default)]
pub struct AnnoncesByState {
    pub creees: Vec<Annonce>,
    pub publiees: Vec<Annonce>,
}

async fn list_by_state(pool: &SqlitePool, publiee: bool) -> Result<Vec<Annonce>, RepoError> {
    let rows = sqlx::query_as::<_, AnnonceRow>(&format!(
        "{SELECT_COLUMNS} WHERE publiee = ? ORDER BY epingle DESC, id DESC"
    ))
    .bind(publiee)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Annonce::from).collect())
}

pub async fn list_all(pool: &SqlitePool) -> Result<AnnoncesByState, RepoError> {
    Ok(AnnoncesByState {
        creees: list_by_state(pool, false).await?,
        publiees: list_by_state(pool, true).await?,
    })
}

#[cfg(test)]
pub async fn get(pool: &SqlitePool, id: i64) -> Result<Annonce, RepoError> {
    sqlx::query_as::<_, AnnonceRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Annonce::from)
        .ok_or(RepoError::NotFound)
}

/// Inserts a new draft and returns its id.
pub async fn create(
    pool: &SqlitePool,
    fields: &AnnonceFields,
    images: &[String],
) -> Result<i64, RepoError> {
    let result = sqlx::query(
        r#"
        INSERT INTO annonces (titre, contenu, adresse, youtube, images, publiee, epingle, tags, lieux, adresses, youtubes)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&fields.titre)
    .bind(&fields.contenu)
    .bind(&fields.adresse)
    .bind(&fields.youtube)
    .bind(join_images(images))
    .bind(fields.epingle)
    .bind(&fields.tags)
    .bind(&fields.lieux)
    .bind(&fields.adresses)
    .bind(&fields.youtubes)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Flips the published flag; the id is preserved.
pub async fn publish(pool: &SqlitePool, id: i64) -> Result<(), RepoError> {
    let result = sqlx::query("UPDATE annonces SET publiee = 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

/// Removes the row only. Image files stay on disk.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), RepoError> {
    let result = sqlx::query("DELETE FROM annonces WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}

/// Overwrites every editable field. The image list becomes exactly `images`;
/// previously stored images are dropped from the row but left on disk.
pub async fn edit(
    pool: &SqlitePool,
    id: i64,
    fields: &AnnonceFields,
    images: &[String],
) -> Result<(), RepoError> {
    let result = sqlx::query(
        r#"
        UPDATE annonces
        SET titre = ?, contenu = ?, adresse = ?, youtube = ?, images = ?, epingle = ?,
            tags = ?, lieux = ?, adresses = ?, youtubes = ?
        WHERE id = ?
        "#,
    )
    .bind(&fields.titre)
    .bind(&fields.contenu)
    .bind(&fields.adresse)
    .bind(&fields.youtube)
    .bind(join_images(images))
    .bind(fields.epingle)
    .bind(&fields.tags)
    .bind(&fields.lieux)
    .bind(&fields.adresses)
    .bind(&fields.youtubes)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepoError::NotFound);
    }
    Ok(())
}
