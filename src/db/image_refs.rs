//! Reference counts for uploaded images in the two-table database.
//!
//! A path is attached once per row that lists it. When the last reference is
//! detached the path is *released*: its count row is removed and the caller
//! deletes the file after committing.

use sqlx::SqliteConnection;

pub async fn attach(conn: &mut SqliteConnection, paths: &[String]) -> Result<(), sqlx::Error> {
    for path in paths {
        sqlx::query(
            r#"
            INSERT INTO image_refs (path, refs) VALUES (?, 1)
            ON CONFLICT (path) DO UPDATE SET refs = refs + 1
            "#,
        )
        .bind(path)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Drops one reference per path and returns the paths that are no longer
/// referenced. Untracked paths count as released.
pub async fn detach(
    conn: &mut SqliteConnection,
    paths: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    let mut released = Vec::new();

    for path in paths {
        sqlx::query("UPDATE image_refs SET refs = refs - 1 WHERE path = ?")
            .bind(path)
            .execute(&mut *conn)
            .await?;

        let remaining: Option<(i64,)> = sqlx::query_as("SELECT refs FROM image_refs WHERE path = ?")
            .bind(path)
            .fetch_optional(&mut *conn)
            .await?;

        match remaining {
            Some((refs,)) if refs > 0 => {}
            _ => {
                sqlx::query("DELETE FROM image_refs WHERE path = ?")
                    .bind(path)
                    .execute(&mut *conn)
                    .await?;
                if !released.contains(path) {
                    released.push(path.clone());
                }
            }
        }
    }

    Ok(released)
}

pub async fn count(conn: &mut SqliteConnection, path: &str) -> Result<i64, sqlx::Error> {
    let refs: Option<(i64,)> = sqlx::query_as("SELECT refs FROM image_refs WHERE path = ?")
        .bind(path)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(refs.map(|(r,)| r).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;

    #[tokio::test]
    async fn test_shared_path_released_on_last_detach() {
        let dir = tempfile::tempdir().unwrap();
        let (_, pool) = test_support::pools(&dir).await;
        let mut conn = pool.acquire().await.unwrap();

        let shared = vec!["/static/uploads/shared.png".to_string()];
        attach(&mut conn, &shared).await.unwrap();
        attach(&mut conn, &shared).await.unwrap();
        assert_eq!(count(&mut conn, &shared[0]).await.unwrap(), 2);

        assert!(detach(&mut conn, &shared).await.unwrap().is_empty());
        assert_eq!(detach(&mut conn, &shared).await.unwrap(), shared);
        assert_eq!(count(&mut conn, &shared[0]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_untracked_path_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let (_, pool) = test_support::pools(&dir).await;
        let mut conn = pool.acquire().await.unwrap();

        let legacy = vec!["/static/uploads/legacy.jpg".to_string()];
        assert_eq!(detach(&mut conn, &legacy).await.unwrap(), legacy);
    }
}
