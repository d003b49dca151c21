//! Integration tests for database initialization
//!
//! Covers automatic creation, idempotent reopen, foreign-key enforcement
//! and the cascade graph from users down to key takeaways.

use notebook_common::db::{init_database, test_connection, users};
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("notebook.db");

    let result = init_database(&db_path, 4).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("notebook.db");

    let pool1 = init_database(&db_path, 2).await.unwrap();
    pool1.close().await;

    let pool2 = init_database(&db_path, 2).await;
    assert!(pool2.is_ok(), "Failed to open existing database: {:?}", pool2.err());
}

#[tokio::test]
async fn test_all_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("notebook.db"), 2).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    for expected in [
        "course_files",
        "courses",
        "files",
        "key_takeaways",
        "model_usage",
        "modules",
        "usage_logs",
        "user_stats",
        "users",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn test_foreign_keys_enforced_on_every_connection() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("notebook.db"), 4).await.unwrap();

    // Hold several connections so the check is not satisfied by one lucky connection
    let mut held = Vec::new();
    for _ in 0..3 {
        let mut conn = pool.acquire().await.unwrap();
        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(enabled, 1);
        held.push(conn);
    }
}

#[tokio::test]
async fn test_course_without_owner_rejected() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("notebook.db"), 2).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO courses (id, owner_id, title, description, created_at, updated_at) VALUES ('c', 'nobody', 't', '', 'x', 'x')",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "Orphan course row must violate the owner foreign key");
}

#[tokio::test]
async fn test_deleting_user_cascades_to_course_tree() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("notebook.db"), 2).await.unwrap();
    let owner = users::create_user(&pool, "owner", "owner@example.com").await.unwrap();

    sqlx::query(
        "INSERT INTO courses (id, owner_id, title, description, created_at, updated_at) VALUES ('c1', ?, 't', '', 'x', 'x')",
    )
    .bind(owner.to_string())
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO modules (id, course_id, heading, summary, order_index) VALUES ('m1', 'c1', 'h', 's', 0)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO key_takeaways (id, module_id, content, order_index) VALUES ('k1', 'm1', 'a', 0)")
        .execute(&pool)
        .await
        .unwrap();

    assert!(users::delete_user(&pool, owner).await.unwrap());

    for table in ["courses", "modules", "key_takeaways"] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0, "{} should be empty after owner deletion", table);
    }
}

#[tokio::test]
async fn test_order_index_unique_within_course() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("notebook.db"), 2).await.unwrap();
    let owner = users::create_user(&pool, "owner", "owner@example.com").await.unwrap();

    sqlx::query(
        "INSERT INTO courses (id, owner_id, title, description, created_at, updated_at) VALUES ('c1', ?, 't', '', 'x', 'x')",
    )
    .bind(owner.to_string())
    .execute(&pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO modules (id, course_id, heading, summary, order_index) VALUES ('m1', 'c1', 'h', 's', 0)")
        .execute(&pool)
        .await
        .unwrap();

    let dup = sqlx::query("INSERT INTO modules (id, course_id, heading, summary, order_index) VALUES ('m2', 'c1', 'h', 's', 0)")
        .execute(&pool)
        .await;
    assert!(dup.is_err());
}

#[tokio::test]
async fn test_connection_check() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("notebook.db"), 1).await.unwrap();

    assert!(test_connection(&pool).await);
    pool.close().await;
    assert!(!test_connection(&pool).await);
}
