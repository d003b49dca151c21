//! Shared fixtures for notebook-server integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use notebook_common::db::{files, init_database, users, FileRecord, NewFile};
use notebook_common::{Error, Result};
use notebook_server::collaborators::{CourseGenerator, GeneratedPayload, ObjectStore};
use notebook_server::models::{
    CourseDraft, CourseSummary, ModuleDraft, PersistedCourse, PersistedModule,
};
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Mutex;
use tempfile::TempDir;
use uuid::Uuid;

/// Fresh database in a temp dir; keep the `TempDir` alive for the test
pub async fn setup_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("temp dir");
    let pool = init_database(&dir.path().join("notebook.db"), 4)
        .await
        .expect("database init");
    (dir, pool)
}

pub async fn create_user(pool: &SqlitePool, name: &str) -> Uuid {
    users::create_user(pool, name, &format!("{}@example.com", name))
        .await
        .expect("create user")
}

pub async fn create_file(pool: &SqlitePool, user_id: Uuid, key: &str) -> FileRecord {
    files::insert_file(
        pool,
        &NewFile {
            user_id,
            filename: key.to_string(),
            original_name: "lecture.pdf".to_string(),
            mime_type: "application/pdf".to_string(),
            size: 8,
            path: key.to_string(),
            url: format!("file:///uploads/{}", key),
        },
    )
    .await
    .expect("insert file")
}

pub fn module(heading: &str, takeaways: &[&str]) -> ModuleDraft {
    ModuleDraft {
        heading: heading.to_string(),
        summary: format!("{} summary", heading),
        key_takeaways: takeaways.iter().map(|t| t.to_string()).collect(),
    }
}

/// Valid three-module draft
pub fn sample_draft(title: &str) -> CourseDraft {
    CourseDraft {
        title: title.to_string(),
        description: "D".to_string(),
        modules: vec![
            module("H1", &["a", "b", "c"]),
            module("H2", &["d", "e", "f"]),
            module("H3", &["g", "h", "i", "j"]),
        ],
    }
}

/// Takeaway contents of a persisted module, in order
pub fn takeaway_texts(module: &PersistedModule) -> Vec<&str> {
    module.key_takeaways.iter().map(|t| t.content.as_str()).collect()
}

/// Every module and takeaway id in a persisted tree
pub fn entity_ids(course: &PersistedCourse) -> Vec<Uuid> {
    course
        .modules
        .iter()
        .flat_map(|m| std::iter::once(m.id).chain(m.key_takeaways.iter().map(|t| t.id)))
        .collect()
}

/// Summary view a listing should return for this course
pub fn summary_of(course: &PersistedCourse) -> CourseSummary {
    CourseSummary {
        id: course.id,
        owner_id: course.owner_id,
        title: course.title.clone(),
        description: course.description.clone(),
        created_at: course.created_at,
        updated_at: course.updated_at,
    }
}

pub async fn count(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

/// In-memory object store
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn with(key: &str, bytes: &[u8]) -> Self {
        let store = Self::default();
        store
            .objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        store
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<String> {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), bytes.to_vec());
        self.url(key)
    }

    fn url(&self, key: &str) -> Result<String> {
        Ok(format!("memory://{}", key))
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::ExternalService(format!("no object '{}'", key)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Generator returning a canned payload, or failing
pub struct StubGenerator {
    pub response: std::result::Result<Value, String>,
    pub tokens_used: i64,
}

impl StubGenerator {
    pub fn returning(payload: Value) -> Self {
        Self {
            response: Ok(payload),
            tokens_used: 120,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            tokens_used: 0,
        }
    }
}

#[async_trait]
impl CourseGenerator for StubGenerator {
    async fn generate(&self, _document: &[u8], _model: &str, _engine: &str) -> Result<GeneratedPayload> {
        match &self.response {
            Ok(payload) => Ok(GeneratedPayload {
                payload: payload.clone(),
                tokens_used: self.tokens_used,
            }),
            Err(message) => Err(Error::ExternalService(message.clone())),
        }
    }
}

/// Gateway payload that normalizes into a three-module course
pub fn gateway_payload() -> Value {
    serde_json::json!({
        "title": "T",
        "description": "D",
        "modules": [
            {"heading": "H1", "summary": "S1", "key_takeaways": ["a", "b"]},
            {"heading": "H2", "summary": "S2", "key_takeaways": ["a", "b", "c"]},
            {"heading": "H3", "summary": "S3", "key_takeaways": ["a", "b", "c", "d"]}
        ]
    })
}
