//! HTTP API handlers

pub mod auth;
pub mod courses;
pub mod health;
pub mod stats;

pub use auth::AuthenticatedUser;
pub use health::health_routes;
