//! Caller identity

use async_trait::async_trait;
use notebook_common::{db::users, Error, Result};
use sqlx::SqlitePool;
use uuid::Uuid;

/// Resolves a request credential to the owner id it stands for
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: &str) -> Result<Uuid>;
}

/// Accepts a user id issued by an upstream identity proxy, provided the
/// user is registered.
#[derive(Clone)]
pub struct TrustedUserAuthenticator {
    pool: SqlitePool,
}

impl TrustedUserAuthenticator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authenticator for TrustedUserAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<Uuid> {
        let user_id = Uuid::parse_str(credential.trim())
            .map_err(|_| Error::Authorization("invalid credential".to_string()))?;

        if users::user_exists(&self.pool, user_id).await? {
            Ok(user_id)
        } else {
            Err(Error::Authorization("unknown user".to_string()))
        }
    }
}
