//! Course services: normalization, persistence, usage accounting,
//! export and the generation pipeline.

pub mod course_pipeline;
pub mod course_store;
pub mod export;
pub mod normalizer;
pub mod usage_ledger;

pub use course_pipeline::{CoursePipeline, GenerationOptions};
pub use course_store::CourseStore;
pub use usage_ledger::{ActionType, EventDetails, UsageLedger};
