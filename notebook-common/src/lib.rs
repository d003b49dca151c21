//! # Notebook Common Library
//!
//! Shared code for the notebook services including:
//! - Error taxonomy
//! - Configuration loading and root folder resolution
//! - Database initialization, schema and the user/file registries
//! - Timestamp and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
