//! Database initialization, schema and collaborator registries

pub mod files;
pub mod init;
pub mod users;

pub use files::{FileRecord, NewFile};
pub use init::*;
