//! Course generation pipeline
//!
//! Composes file lookup, the object store, the AI gateway, the normalizer,
//! the usage ledger and the persistence engine into the create-from-file
//! workflow.

use crate::collaborators::catalog::{DEFAULT_ENGINE, DEFAULT_MODEL};
use crate::collaborators::{CourseGenerator, ModelCatalog, ObjectStore};
use crate::models::{CourseDraft, PersistedCourse};
use crate::services::course_store::CourseStore;
use crate::services::normalizer::normalize;
use crate::services::usage_ledger::{
    ActionType, EventDetails, InvocationStatus, ModelInvocation, UsageLedger,
};
use notebook_common::db::files;
use notebook_common::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Model and engine choice for one generation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerationOptions {
    pub pdf_engine: Option<String>,
    pub ai_model: Option<String>,
}

impl GenerationOptions {
    pub fn model(&self) -> &str {
        self.ai_model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn engine(&self) -> &str {
        self.pdf_engine.as_deref().unwrap_or(DEFAULT_ENGINE)
    }
}

#[derive(Clone)]
pub struct CoursePipeline {
    store: CourseStore,
    ledger: UsageLedger,
    objects: Arc<dyn ObjectStore>,
    generator: Arc<dyn CourseGenerator>,
    catalog: ModelCatalog,
}

impl CoursePipeline {
    pub fn new(
        store: CourseStore,
        ledger: UsageLedger,
        objects: Arc<dyn ObjectStore>,
        generator: Arc<dyn CourseGenerator>,
        catalog: ModelCatalog,
    ) -> Self {
        Self {
            store,
            ledger,
            objects,
            generator,
            catalog,
        }
    }

    /// Generate a course from an uploaded document and persist it
    pub async fn create_from_file(
        &self,
        owner_id: Uuid,
        file_id: Uuid,
        options: &GenerationOptions,
    ) -> Result<PersistedCourse> {
        let file = files::find_file(self.store.pool(), file_id)
            .await?
            .filter(|f| f.user_id == owner_id)
            .ok_or_else(|| Error::NotFound("file not found or not authorized".to_string()))?;

        let model = options.model();
        let engine = options.engine();
        self.catalog.validate_model(model)?;
        self.catalog.validate_engine(engine)?;

        let started = Instant::now();
        let mut tokens_used = 0;
        let attempt: Result<CourseDraft> = async {
            let document = self.objects.fetch(&file.path).await?;
            let generated = self.generator.generate(&document, model, engine).await?;
            tokens_used = generated.tokens_used;
            normalize(&generated.payload)
        }
        .await;
        let processing_time_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        let (status, error_message) = match &attempt {
            Ok(_) => (InvocationStatus::Success, None),
            Err(e) => (InvocationStatus::Error, Some(e.to_string())),
        };

        self.ledger
            .record_model_invocation(&ModelInvocation {
                user_id: owner_id,
                model_name: model.to_string(),
                engine_name: Some(engine.to_string()),
                tokens_used,
                processing_time_ms,
                status,
                error_message: error_message.clone(),
            })
            .await?;

        let mut details = EventDetails::new()
            .with("model", model)
            .with("engine", engine)
            .with("processingTime", processing_time_ms)
            .with("tokensUsed", tokens_used);
        if let Some(message) = &error_message {
            details.insert("error", message.as_str());
        }
        self.ledger
            .record_event(owner_id, ActionType::ModelCall, &details)
            .await;

        let draft = match attempt {
            Ok(draft) => draft,
            Err(e) => {
                warn!(
                    owner_id = %owner_id,
                    file_id = %file_id,
                    model,
                    error = %e,
                    "Course generation failed"
                );
                return Err(e);
            }
        };

        let course = self.store.create(owner_id, &draft, Some(file.id)).await?;

        self.ledger
            .record_event(
                owner_id,
                ActionType::CourseCreate,
                &EventDetails::new()
                    .with("courseId", course.id.to_string())
                    .with("title", course.title.as_str())
                    .with("moduleCount", course.modules.len()),
            )
            .await;

        info!(
            course_id = %course.id,
            file_id = %file_id,
            model,
            processing_time_ms,
            "Generated course from file"
        );
        Ok(course)
    }
}
