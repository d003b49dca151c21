//! Boundary traits for the services a course workflow depends on, plus
//! the concrete adapters the binary wires in.

pub mod auth;
pub mod catalog;
pub mod gateway;
pub mod object_store;

pub use auth::{Authenticator, TrustedUserAuthenticator};
pub use catalog::{EngineInfo, ModelCatalog, ModelInfo};
pub use gateway::{CourseGenerator, GeneratedPayload, OpenRouterGenerator};
pub use object_store::{LocalObjectStore, ObjectStore};
