use std::{sync::Arc, time::Duration};

use serde_json::Value;
use tracing::debug;

use crate::{cache::Cache, error::RepoError};

const SESSION_KEY_PREFIX: &str = "user_uuid:";

pub fn session_key(user_uid: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{user_uid}")
}

/// Session markers kept in the cache. A live marker is required on top of a valid token.
#[derive(Clone)]
pub struct SessionStore {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Marks `user_uid` as logged in. Repeated calls reset the expiry.
    pub async fn create_session(&self, user_uid: &str) -> Result<(), RepoError> {
        self.cache
            .set(&session_key(user_uid), Value::Bool(true), self.ttl)
            .await?;
        debug!(%user_uid, ttl_secs = self.ttl.as_secs(), "session marker set");
        Ok(())
    }

    pub async fn delete_session(&self, user_uid: &str) -> Result<(), RepoError> {
        self.cache.delete(&session_key(user_uid)).await?;
        debug!(%user_uid, "session marker removed");
        Ok(())
    }

    pub async fn session_exists(&self, user_uid: &str) -> Result<bool, RepoError> {
        Ok(self.cache.exists(&session_key(user_uid)).await?)
    }
}
