//! User registry
//!
//! Account management lives in the identity service; this table only
//! anchors ownership so that deleting a user cascades to their courses,
//! files and usage records.

use crate::{time, uuid_utils, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Register a user and return the new id
pub async fn create_user(pool: &SqlitePool, username: &str, email: &str) -> Result<Uuid> {
    let id = uuid_utils::generate();
    let now = time::now_db();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(username)
    .bind(email)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::debug!(user_id = %id, username, "Registered user");

    Ok(id)
}

pub async fn user_exists(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Delete a user; courses, files and ledger rows go with it
pub async fn delete_user(pool: &SqlitePool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_and_delete_user() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("users.db"), 2).await.unwrap();

        let id = create_user(&pool, "ada", "ada@example.com").await.unwrap();
        assert!(user_exists(&pool, id).await.unwrap());

        assert!(delete_user(&pool, id).await.unwrap());
        assert!(!user_exists(&pool, id).await.unwrap());
        assert!(!delete_user(&pool, id).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("users.db"), 2).await.unwrap();

        create_user(&pool, "ada", "ada@example.com").await.unwrap();
        let dup = create_user(&pool, "ada2", "ada@example.com").await;
        assert!(matches!(dup, Err(crate::Error::Persistence(_))));
    }
}
