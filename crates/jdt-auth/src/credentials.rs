//! Cached credential record
//!
//! One JSON record per application identity, stored under the configured
//! cache key: `{"access_token": "...", "expire_time": <unix seconds>}`.
//! A refresh writes a whole new record over the old one; there is no
//! partial update and no deletion. Staleness is detected on read.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{Cache, Visibility};
use crate::constants::REFRESH_SKEW_SECS;
use crate::error::{Error, Result};

/// A cached access token.
///
/// `expire_time` is an absolute unix timestamp in seconds, computed at
/// storage time from the issued lifetime plus the current time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub expire_time: i64,
}

impl CredentialRecord {
    /// Record for a token issued at `now` with a lifetime of `expires_in_secs`.
    pub fn issued(access_token: String, expires_in_secs: i64, now: i64) -> Self {
        Self {
            access_token,
            expire_time: now.saturating_add(expires_in_secs),
        }
    }

    /// Seconds left before hard expiry (negative once expired).
    pub fn remaining(&self, now: i64) -> i64 {
        self.expire_time.saturating_sub(now)
    }

    /// Usable iff non-empty and more than `REFRESH_SKEW_SECS` remain.
    pub fn is_usable(&self, now: i64) -> bool {
        !self.access_token.is_empty() && self.remaining(now) > REFRESH_SKEW_SECS
    }
}

/// Current unix time in seconds.
pub fn now_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Reads and writes the single credential record for this deployment.
#[derive(Clone)]
pub struct CredentialStore {
    cache: Arc<dyn Cache>,
    key: String,
}

impl CredentialStore {
    pub fn new(cache: Arc<dyn Cache>, key: impl Into<String>) -> Self {
        Self {
            cache,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the record with a single cache read.
    ///
    /// Read failures and unparsable content are logged and reported as a
    /// miss, so the caller falls back to re-authentication.
    pub async fn load(&self) -> Option<CredentialRecord> {
        let contents = match self.cache.get(&self.key).await {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                debug!(key = %self.key, "no cached credential");
                return None;
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "credential cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str::<CredentialRecord>(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(key = %self.key, error = %e, "malformed cached credential, treating as miss");
                None
            }
        }
    }

    /// Persist a new record.
    ///
    /// The first write creates the entry with public visibility; later
    /// writes overwrite it and keep whatever visibility it has.
    pub async fn save(&self, record: &CredentialRecord) -> Result<()> {
        let json = serde_json::to_string(record)
            .map_err(|e| Error::Cache(format!("serializing credential: {e}")))?;

        let visibility = if self.cache.has(&self.key).await? {
            None
        } else {
            Some(Visibility::Public)
        };
        self.cache.put(&self.key, json, visibility).await?;
        debug!(key = %self.key, created = visibility.is_some(), "saved credential");
        Ok(())
    }
}
