//! notebook-server library
//!
//! Course generation and persistence service: turns uploaded documents
//! into structured courses via an AI gateway, stores the course tree, and
//! keeps a per-user usage ledger.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod collaborators;
pub mod error;
pub mod models;
pub mod services;

use collaborators::{Authenticator, CourseGenerator, ModelCatalog, ObjectStore};
use services::{CoursePipeline, CourseStore, UsageLedger};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: CourseStore,
    pub ledger: UsageLedger,
    pub pipeline: CoursePipeline,
    pub authenticator: Arc<dyn Authenticator>,
    pub catalog: ModelCatalog,
}

impl AppState {
    /// Wire the services over one store handle and the given collaborators
    pub fn new(
        pool: SqlitePool,
        authenticator: Arc<dyn Authenticator>,
        objects: Arc<dyn ObjectStore>,
        generator: Arc<dyn CourseGenerator>,
    ) -> Self {
        let store = CourseStore::new(pool.clone());
        let ledger = UsageLedger::new(pool);
        let catalog = ModelCatalog::new();
        let pipeline = CoursePipeline::new(
            store.clone(),
            ledger.clone(),
            objects,
            generator,
            catalog,
        );

        Self {
            store,
            ledger,
            pipeline,
            authenticator,
            catalog,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::courses::course_routes())
        .merge(api::stats::stats_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
