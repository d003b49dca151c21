//! Uploaded file registry
//!
//! Rows are written by the upload collaborator after the bytes are in the
//! object store. Courses link to them through `course_files`.

use crate::{time, uuid_utils, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Stored file metadata
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FileRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    /// Object store key
    pub path: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when registering an upload
#[derive(Debug, Clone)]
pub struct NewFile {
    pub user_id: Uuid,
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: i64,
    pub path: String,
    pub url: String,
}

/// Register an uploaded file
pub async fn insert_file(pool: &SqlitePool, file: &NewFile) -> Result<FileRecord> {
    let id = uuid_utils::generate();
    let created_text = time::now_db();
    let created_at = time::parse_db(&created_text)?;

    sqlx::query(
        r#"
        INSERT INTO files (id, user_id, filename, original_name, mime_type, size, path, url, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(file.user_id.to_string())
    .bind(&file.filename)
    .bind(&file.original_name)
    .bind(&file.mime_type)
    .bind(file.size)
    .bind(&file.path)
    .bind(&file.url)
    .bind(&created_text)
    .execute(pool)
    .await?;

    Ok(FileRecord {
        id,
        user_id: file.user_id,
        filename: file.filename.clone(),
        original_name: file.original_name.clone(),
        mime_type: file.mime_type.clone(),
        size: file.size,
        path: file.path.clone(),
        url: file.url.clone(),
        created_at,
    })
}

pub async fn find_file(pool: &SqlitePool, id: Uuid) -> Result<Option<FileRecord>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, filename, original_name, mime_type, size, path, url, created_at
        FROM files
        WHERE id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.map(|r| file_from_row(&r)).transpose()
}

/// Files owned by a user, newest first
pub async fn files_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<FileRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, filename, original_name, mime_type, size, path, url, created_at
        FROM files
        WHERE user_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(file_from_row).collect()
}

/// Delete a file owned by `user_id`; course links cascade
pub async fn delete_file(pool: &SqlitePool, id: Uuid, user_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM files WHERE id = ? AND user_id = ?")
        .bind(id.to_string())
        .bind(user_id.to_string())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn file_from_row(row: &SqliteRow) -> Result<FileRecord> {
    let id: String = row.try_get("id")?;
    let user_id: String = row.try_get("user_id")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(FileRecord {
        id: uuid_utils::parse_stored(&id)?,
        user_id: uuid_utils::parse_stored(&user_id)?,
        filename: row.try_get("filename")?,
        original_name: row.try_get("original_name")?,
        mime_type: row.try_get("mime_type")?,
        size: row.try_get("size")?,
        path: row.try_get("path")?,
        url: row.try_get("url")?,
        created_at: time::parse_db(&created_at)?,
    })
}
