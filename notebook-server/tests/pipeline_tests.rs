//! Integration tests for course generation from an uploaded file

mod helpers;

use helpers::{
    count, create_file, create_user, gateway_payload, setup_db, takeaway_texts, MemoryObjectStore,
    StubGenerator,
};
use notebook_common::Error;
use notebook_server::collaborators::ModelCatalog;
use notebook_server::services::usage_ledger::ActionType;
use notebook_server::services::{CoursePipeline, CourseStore, GenerationOptions, UsageLedger};
use serde_json::json;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

fn pipeline(pool: &SqlitePool, generator: StubGenerator) -> (CoursePipeline, UsageLedger) {
    let ledger = UsageLedger::new(pool.clone());
    let pipeline = CoursePipeline::new(
        CourseStore::new(pool.clone()),
        ledger.clone(),
        Arc::new(MemoryObjectStore::with("alice/lecture.pdf", b"%PDF-1.4")),
        Arc::new(generator),
        ModelCatalog::new(),
    );
    (pipeline, ledger)
}

#[tokio::test]
async fn test_create_from_file_persists_normalized_course() {
    let (_dir, pool) = setup_db().await;
    let owner = create_user(&pool, "alice").await;
    let file = create_file(&pool, owner, "alice/lecture.pdf").await;
    let (pipeline, ledger) = pipeline(&pool, StubGenerator::returning(gateway_payload()));

    let course = pipeline
        .create_from_file(owner, file.id, &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(course.title, "T");
    assert_eq!(course.file_ids, vec![file.id]);
    assert_eq!(takeaway_texts(&course.modules[0]), vec!["a", "b", "Key point 3"]);

    let stats = ledger.user_stats(owner).await.unwrap();
    assert_eq!(stats.total_courses, 1);
    assert_eq!(stats.total_model_calls, 1);
    assert_eq!(stats.total_tokens_used, 120);
    assert_eq!(stats.model_stats[0].model_name, "anthropic/claude-3.7-sonnet");

    let recent = ledger.recent_activity(owner, 10).await;
    let actions: Vec<ActionType> = recent.iter().map(|e| e.action_type).collect();
    assert_eq!(actions, vec![ActionType::CourseCreate, ActionType::ModelCall]);
    assert_eq!(recent[0].details.get("moduleCount"), Some(&json!(3)));
    assert_eq!(recent[0].details.get("courseId"), Some(&json!(course.id.to_string())));
}

#[tokio::test]
async fn test_foreign_file_is_not_found() {
    let (_dir, pool) = setup_db().await;
    let alice = create_user(&pool, "alice").await;
    let mallory = create_user(&pool, "mallory").await;
    let file = create_file(&pool, alice, "alice/lecture.pdf").await;
    let (pipeline, _) = pipeline(&pool, StubGenerator::returning(gateway_payload()));

    for file_id in [file.id, Uuid::new_v4()] {
        let err = pipeline
            .create_from_file(mallory, file_id, &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(ref m) if m == "file not found or not authorized"));
    }
    assert_eq!(count(&pool, "model_usage").await, 0);
    assert_eq!(count(&pool, "courses").await, 0);
}

#[tokio::test]
async fn test_unknown_model_rejected_before_generation() {
    let (_dir, pool) = setup_db().await;
    let owner = create_user(&pool, "alice").await;
    let file = create_file(&pool, owner, "alice/lecture.pdf").await;
    let (pipeline, _) = pipeline(&pool, StubGenerator::returning(gateway_payload()));

    let options = GenerationOptions {
        ai_model: Some("openai/gpt-2".to_string()),
        pdf_engine: None,
    };
    let err = pipeline.create_from_file(owner, file.id, &options).await.unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(count(&pool, "model_usage").await, 0);
}

#[tokio::test]
async fn test_gateway_failure_recorded_and_returned() {
    let (_dir, pool) = setup_db().await;
    let owner = create_user(&pool, "alice").await;
    let file = create_file(&pool, owner, "alice/lecture.pdf").await;
    let (pipeline, ledger) = pipeline(&pool, StubGenerator::failing("gateway timed out"));

    let err = pipeline
        .create_from_file(owner, file.id, &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ExternalService(ref m) if m == "gateway timed out"));
    assert_eq!(count(&pool, "courses").await, 0);

    let per_model = ledger.model_usage_stats(owner).await.unwrap();
    assert_eq!(per_model[0].total_calls, 1);
    assert!(per_model[0].success_rate.abs() < f64::EPSILON);

    let error_message: Option<String> =
        sqlx::query_scalar("SELECT error_message FROM model_usage")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(error_message.unwrap().contains("gateway timed out"));
}

#[tokio::test]
async fn test_short_payload_is_validation_failure() {
    let (_dir, pool) = setup_db().await;
    let owner = create_user(&pool, "alice").await;
    let file = create_file(&pool, owner, "alice/lecture.pdf").await;
    let payload = json!({
        "title": "T",
        "description": "D",
        "modules": [{"heading": "H1", "summary": "S1", "key_takeaways": []}]
    });
    let (pipeline, _) = pipeline(&pool, StubGenerator::returning(payload));

    let err = pipeline
        .create_from_file(owner, file.id, &GenerationOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(ref m) if m == "insufficient modules"));
    assert_eq!(count(&pool, "courses").await, 0);
    assert_eq!(count(&pool, "model_usage").await, 1);
}

#[tokio::test]
async fn test_blank_heading_and_summary_get_defaults() {
    let (_dir, pool) = setup_db().await;
    let owner = create_user(&pool, "alice").await;
    let file = create_file(&pool, owner, "alice/lecture.pdf").await;
    let payload = json!({
        "title": "T",
        "description": "D",
        "modules": [
            {"heading": "   ", "summary": "S1", "key_takeaways": ["a", "b", "c"]},
            {"heading": "H2", "summary": " ", "key_takeaways": ["a", "b", "c"]},
            {"heading": "H3", "summary": "S3", "key_takeaways": ["a", "b", "c"]}
        ]
    });
    let (pipeline, ledger) = pipeline(&pool, StubGenerator::returning(payload));

    let course = pipeline
        .create_from_file(owner, file.id, &GenerationOptions::default())
        .await
        .unwrap();

    assert_eq!(course.modules[0].heading, "Module 1");
    assert_eq!(course.modules[1].summary, "No summary provided");
    assert_eq!(count(&pool, "courses").await, 1);

    let per_model = ledger.model_usage_stats(owner).await.unwrap();
    assert!((per_model[0].success_rate - 100.0).abs() < f64::EPSILON);
}
