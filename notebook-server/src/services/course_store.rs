//! Course persistence engine
//!
//! Writes, replaces and deletes the course → module → key takeaway tree.
//! Every write runs in one transaction on one pooled connection; either the
//! whole tree commits or the transaction is rolled back and the caller gets
//! [`Error::Persistence`]. Order indexes always come from list position.
//!
//! Concurrent `update` calls on the same course are serialized by SQLite's
//! single-writer lock (the first statement of an update is a write) and the
//! last committed transaction wins. There is no version check.

use crate::models::{
    validate_modules, CourseDraft, CoursePatch, CourseSummary, ModuleDraft, PersistedCourse,
    PersistedModule, PersistedTakeaway,
};
use notebook_common::{time, uuid_utils, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Course persistence engine over an injected store handle
#[derive(Clone)]
pub struct CourseStore {
    pool: SqlitePool,
}

impl CourseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a course with its full module tree
    ///
    /// **Algorithm:**
    /// 1. Validate draft invariants (nothing is written on failure)
    /// 2. Begin transaction
    /// 3. Insert course row, then the optional file link
    /// 4. For each module in order: insert module, bulk-insert takeaways
    /// 5. Commit, then re-read the committed tree
    pub async fn create(
        &self,
        owner_id: Uuid,
        draft: &CourseDraft,
        file_id: Option<Uuid>,
    ) -> Result<PersistedCourse> {
        draft.validate()?;

        let course_id = uuid_utils::generate();
        let now = time::now_db();

        let mut tx = self.pool.begin().await?;

        let written: Result<()> = async {
            sqlx::query(
                r#"
                INSERT INTO courses (id, owner_id, title, description, created_at, updated_at)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(course_id.to_string())
            .bind(owner_id.to_string())
            .bind(&draft.title)
            .bind(&draft.description)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

            if let Some(file_id) = file_id {
                link_file(&mut tx, course_id, file_id, &now).await?;
            }

            insert_modules(&mut tx, course_id, &draft.modules).await
        }
        .await;

        if let Err(e) = written {
            warn!(course_id = %course_id, error = %e, "Course creation failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(course_id = %course_id, error = %rollback_err, "Rollback failed");
            }
            return Err(e);
        }

        tx.commit().await?;

        info!(
            course_id = %course_id,
            owner_id = %owner_id,
            modules = draft.modules.len(),
            "Course created"
        );

        self.find_by_id(course_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("course {} vanished after commit", course_id)))
    }

    /// Apply a partial update
    ///
    /// Scalar fields are written only when present. When `modules` is
    /// present the existing subtree is deleted and the new one inserted
    /// with fresh ids; nothing from the old subtree survives.
    pub async fn update(&self, course_id: Uuid, patch: &CoursePatch) -> Result<PersistedCourse> {
        patch.validate()?;

        let mut tx = self.pool.begin().await?;

        let written: Result<()> = async {
            // Touch first: takes the write lock and detects a missing course
            let touched = sqlx::query(
                r#"
                UPDATE courses
                SET title = COALESCE(?, title),
                    description = COALESCE(?, description),
                    updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(patch.title.as_deref())
            .bind(patch.description.as_deref())
            .bind(time::now_db())
            .bind(course_id.to_string())
            .execute(&mut *tx)
            .await?;

            if touched.rows_affected() == 0 {
                return Err(Error::NotFound(format!("course {}", course_id)));
            }

            if let Some(modules) = &patch.modules {
                let removed = delete_modules(&mut tx, course_id).await?;
                debug!(course_id = %course_id, removed, "Removed existing modules");
                insert_modules(&mut tx, course_id, modules).await?;
            }

            Ok(())
        }
        .await;

        if let Err(e) = written {
            warn!(course_id = %course_id, error = %e, "Course update failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(course_id = %course_id, error = %rollback_err, "Rollback failed");
            }
            return Err(e);
        }

        tx.commit().await?;

        info!(
            course_id = %course_id,
            replaced_modules = ?patch.modules.as_ref().map(Vec::len),
            "Course updated"
        );

        self.find_by_id(course_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("course {}", course_id)))
    }

    /// Replace the module subtree only
    pub async fn replace_modules(
        &self,
        course_id: Uuid,
        modules: Vec<ModuleDraft>,
    ) -> Result<PersistedCourse> {
        validate_modules(&modules)?;
        let patch = CoursePatch {
            modules: Some(modules),
            ..Default::default()
        };
        self.update(course_id, &patch).await
    }

    /// Delete a course; modules, takeaways and file links cascade.
    /// Returns whether a row was removed.
    pub async fn delete(&self, course_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(course_id.to_string())
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(course_id = %course_id, "Course deleted");
        } else {
            debug!(course_id = %course_id, "Delete of absent course");
        }
        Ok(deleted)
    }

    /// Load one course tree, or `None` when it does not exist
    pub async fn find_by_id(&self, course_id: Uuid) -> Result<Option<PersistedCourse>> {
        // One read transaction gives a single consistent snapshot
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT id, owner_id, title, description, created_at, updated_at
            FROM courses
            WHERE id = ?
            "#,
        )
        .bind(course_id.to_string())
        .fetch_optional(&mut *tx)
        .await?;

        let course = match row {
            Some(row) => Some(load_tree(&mut tx, summary_from_row(&row)?).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(course)
    }

    /// All course trees of an owner, newest first
    pub async fn find_by_owner(&self, owner_id: Uuid) -> Result<Vec<PersistedCourse>> {
        let mut tx = self.pool.begin().await?;

        let summaries = owner_summaries(&mut tx, owner_id).await?;
        let mut courses = Vec::with_capacity(summaries.len());
        for summary in summaries {
            courses.push(load_tree(&mut tx, summary).await?);
        }

        tx.commit().await?;
        Ok(courses)
    }

    /// Course rows of an owner without their trees, newest first
    pub async fn list_summaries(&self, owner_id: Uuid) -> Result<Vec<CourseSummary>> {
        let mut conn = self.pool.acquire().await?;
        owner_summaries(&mut conn, owner_id).await
    }
}

async fn link_file(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    file_id: Uuid,
    now: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO course_files (id, course_id, file_id, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(uuid_utils::generate().to_string())
    .bind(course_id.to_string())
    .bind(file_id.to_string())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Insert modules in list order, each followed by its takeaways
async fn insert_modules(
    conn: &mut SqliteConnection,
    course_id: Uuid,
    modules: &[ModuleDraft],
) -> Result<()> {
    for (order_index, module) in modules.iter().enumerate() {
        let module_id = uuid_utils::generate();

        sqlx::query(
            r#"
            INSERT INTO modules (id, course_id, heading, summary, order_index)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(module_id.to_string())
        .bind(course_id.to_string())
        .bind(&module.heading)
        .bind(&module.summary)
        .bind(order_index as i64)
        .execute(&mut *conn)
        .await?;

        insert_takeaways(conn, module_id, &module.key_takeaways).await?;

        debug!(
            course_id = %course_id,
            module_id = %module_id,
            order_index,
            takeaways = module.key_takeaways.len(),
            "Inserted module"
        );
    }

    Ok(())
}

/// Bulk insert of one module's takeaways in a single statement
async fn insert_takeaways(
    conn: &mut SqliteConnection,
    module_id: Uuid,
    takeaways: &[String],
) -> Result<()> {
    if takeaways.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("INSERT INTO key_takeaways (id, module_id, content, order_index) ");
    builder.push_values(takeaways.iter().enumerate(), |mut row, (order_index, content)| {
        row.push_bind(uuid_utils::generate().to_string())
            .push_bind(module_id.to_string())
            .push_bind(content.clone())
            .push_bind(order_index as i64);
    });

    builder.build().execute(&mut *conn).await?;
    Ok(())
}

/// Remove every module (and so every takeaway) of a course
async fn delete_modules(conn: &mut SqliteConnection, course_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM modules WHERE course_id = ?")
        .bind(course_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

async fn owner_summaries(conn: &mut SqliteConnection, owner_id: Uuid) -> Result<Vec<CourseSummary>> {
    let rows = sqlx::query(
        r#"
        SELECT id, owner_id, title, description, created_at, updated_at
        FROM courses
        WHERE owner_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(owner_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(summary_from_row).collect()
}

/// Walk course → modules → takeaways, each level ordered by order_index
async fn load_tree(conn: &mut SqliteConnection, course: CourseSummary) -> Result<PersistedCourse> {
    let course_key = course.id.to_string();

    let module_rows = sqlx::query(
        r#"
        SELECT id, course_id, heading, summary, order_index
        FROM modules
        WHERE course_id = ?
        ORDER BY order_index
        "#,
    )
    .bind(&course_key)
    .fetch_all(&mut *conn)
    .await?;

    let takeaway_rows = sqlx::query(
        r#"
        SELECT kt.id, kt.module_id, kt.content, kt.order_index
        FROM key_takeaways kt
        JOIN modules m ON m.id = kt.module_id
        WHERE m.course_id = ?
        ORDER BY m.order_index, kt.order_index
        "#,
    )
    .bind(&course_key)
    .fetch_all(&mut *conn)
    .await?;

    let file_rows: Vec<String> = sqlx::query_scalar(
        "SELECT file_id FROM course_files WHERE course_id = ? ORDER BY created_at, rowid",
    )
    .bind(&course_key)
    .fetch_all(&mut *conn)
    .await?;

    let mut takeaways_by_module: HashMap<Uuid, Vec<PersistedTakeaway>> = HashMap::new();
    for row in &takeaway_rows {
        let takeaway = takeaway_from_row(row)?;
        takeaways_by_module
            .entry(takeaway.module_id)
            .or_default()
            .push(takeaway);
    }

    let mut modules = Vec::with_capacity(module_rows.len());
    for row in &module_rows {
        let mut module = module_from_row(row)?;
        module.key_takeaways = takeaways_by_module.remove(&module.id).unwrap_or_default();
        modules.push(module);
    }

    let file_ids = file_rows
        .iter()
        .map(|id| uuid_utils::parse_stored(id))
        .collect::<Result<Vec<_>>>()?;

    Ok(PersistedCourse {
        id: course.id,
        owner_id: course.owner_id,
        title: course.title,
        description: course.description,
        created_at: course.created_at,
        updated_at: course.updated_at,
        file_ids,
        modules,
    })
}

fn summary_from_row(row: &SqliteRow) -> Result<CourseSummary> {
    let id: String = row.try_get("id")?;
    let owner_id: String = row.try_get("owner_id")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(CourseSummary {
        id: uuid_utils::parse_stored(&id)?,
        owner_id: uuid_utils::parse_stored(&owner_id)?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: time::parse_db(&created_at)?,
        updated_at: time::parse_db(&updated_at)?,
    })
}

fn module_from_row(row: &SqliteRow) -> Result<PersistedModule> {
    let id: String = row.try_get("id")?;
    let course_id: String = row.try_get("course_id")?;

    Ok(PersistedModule {
        id: uuid_utils::parse_stored(&id)?,
        course_id: uuid_utils::parse_stored(&course_id)?,
        heading: row.try_get("heading")?,
        summary: row.try_get("summary")?,
        order_index: row.try_get("order_index")?,
        key_takeaways: Vec::new(),
    })
}

fn takeaway_from_row(row: &SqliteRow) -> Result<PersistedTakeaway> {
    let id: String = row.try_get("id")?;
    let module_id: String = row.try_get("module_id")?;

    Ok(PersistedTakeaway {
        id: uuid_utils::parse_stored(&id)?,
        module_id: uuid_utils::parse_stored(&module_id)?,
        content: row.try_get("content")?,
        order_index: row.try_get("order_index")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notebook_common::db::{init_database, users};
    use tempfile::TempDir;

    async fn setup() -> (TempDir, CourseStore, Uuid) {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("store.db"), 4).await.unwrap();
        let owner = users::create_user(&pool, "owner", "owner@example.com")
            .await
            .unwrap();
        (dir, CourseStore::new(pool), owner)
    }

    fn module(heading: &str, takeaways: &[&str]) -> ModuleDraft {
        ModuleDraft {
            heading: heading.to_string(),
            summary: format!("{} summary", heading),
            key_takeaways: takeaways.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_find_missing_course_is_none() {
        let (_dir, store, owner) = setup().await;

        assert!(store.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(store.find_by_owner(owner).await.unwrap().is_empty());
        assert!(store.list_summaries(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_takeaways_grouped_under_their_module() {
        let (_dir, store, owner) = setup().await;
        let draft = CourseDraft {
            title: "T".to_string(),
            description: "D".to_string(),
            modules: vec![
                module("A", &["a1", "a2", "a3"]),
                module("B", &["b1", "b2", "b3", "b4"]),
                module("C", &["c1", "c2", "c3"]),
            ],
        };

        let course = store.create(owner, &draft, None).await.unwrap();

        for m in &course.modules {
            assert!(m.key_takeaways.iter().all(|t| t.module_id == m.id));
            assert_eq!(m.course_id, course.id);
        }
        let texts: Vec<&str> = course.modules[1]
            .key_takeaways
            .iter()
            .map(|t| t.content.as_str())
            .collect();
        assert_eq!(texts, vec!["b1", "b2", "b3", "b4"]);
    }
}
