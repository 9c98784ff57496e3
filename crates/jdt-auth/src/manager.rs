//! Access-token lifecycle
//!
//! The fast path is a single cache read: a record with more than
//! `REFRESH_SKEW_SECS` left is returned without touching the network.
//! Everything else (missing, malformed, close to expiry, forced) goes through
//! the configured `Authenticator`.
//!
//! Refreshes are single-flight. Callers that find the cache stale queue on
//! one lock; the first runs the exchange and writes the store, and the rest
//! re-read the store and pick up that token instead of exchanging again.

use std::sync::Arc;

use common::Envelope;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::authenticator::Authenticator;
use crate::constants::LOGIN_SUCCESS_MESSAGE;
use crate::credentials::{CredentialRecord, CredentialStore, now_secs};
use crate::error::Result;
use crate::settings::AuthSettings;

/// A token ready to attach to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    /// Seconds until hard expiry at the time of lookup
    pub expires_in_secs: i64,
}

impl AccessToken {
    /// `{code: "0000", message: "登录成功", data: {access_token, expire_time}}`
    /// where `expire_time` is the remaining lifetime in seconds.
    pub fn to_envelope(&self) -> Envelope {
        Envelope::success(
            LOGIN_SUCCESS_MESSAGE,
            json!({
                "access_token": self.access_token,
                "expire_time": self.expires_in_secs,
            }),
        )
    }

    fn from_record(record: CredentialRecord, now: i64) -> Self {
        let expires_in_secs = record.remaining(now);
        Self {
            access_token: record.access_token,
            expires_in_secs,
        }
    }
}

/// Owns the cached credential and decides when to re-authenticate.
pub struct TokenManager {
    settings: AuthSettings,
    store: CredentialStore,
    authenticator: Arc<dyn Authenticator>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        settings: AuthSettings,
        store: CredentialStore,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            settings,
            store,
            authenticator,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub fn authenticator_id(&self) -> &str {
        self.authenticator.id()
    }

    /// Return a usable token, re-authenticating when needed.
    ///
    /// With `force_refresh` the exchange always runs, whatever the cache holds.
    /// Missing configuration fails before any I/O.
    pub async fn access_token(&self, force_refresh: bool) -> Result<AccessToken> {
        self.settings.validate()?;

        if !force_refresh {
            let now = now_secs();
            if let Some(record) = self.store.load().await.filter(|r| r.is_usable(now)) {
                debug!(remaining_secs = record.remaining(now), "using cached access token");
                return Ok(AccessToken::from_record(record, now));
            }
        }

        let _guard = self.refresh_lock.lock().await;
        let cached = self.store.load().await;
        if !force_refresh {
            let now = now_secs();
            if let Some(record) = cached.as_ref().filter(|r| r.is_usable(now)) {
                debug!("access token refreshed by a concurrent caller");
                return Ok(AccessToken::from_record(record.clone(), now));
            }
        }

        self.exchange(cached.map(|r| r.access_token)).await
    }

    /// Replace a token the gateway has just rejected.
    ///
    /// If the store already holds a different usable token (another caller
    /// refreshed while this request was in flight) that token is returned;
    /// otherwise a new exchange runs.
    pub async fn refresh_rejected(&self, rejected_token: &str) -> Result<AccessToken> {
        self.settings.validate()?;

        let _guard = self.refresh_lock.lock().await;
        let cached = self.store.load().await;
        let now = now_secs();
        if let Some(record) = cached
            .as_ref()
            .filter(|r| r.access_token != rejected_token && r.is_usable(now))
        {
            debug!("rejected token already replaced by a concurrent caller");
            return Ok(AccessToken::from_record(record.clone(), now));
        }

        self.exchange(cached.map(|r| r.access_token)).await
    }

    /// Run the authenticator and persist the result. Caller holds `refresh_lock`.
    async fn exchange(&self, current_token: Option<String>) -> Result<AccessToken> {
        let now = now_secs();
        let issued = match self.authenticator.authenticate(current_token.as_deref()).await {
            Ok(issued) => issued,
            Err(e) => {
                metrics::counter!("jdt_token_refresh_total", "outcome" => "failure").increment(1);
                warn!(authenticator = self.authenticator.id(), error = %e, "token refresh failed");
                return Err(e);
            }
        };
        metrics::counter!("jdt_token_refresh_total", "outcome" => "success").increment(1);

        let record = CredentialRecord::issued(issued.access_token, issued.expires_in_secs, now);
        if let Err(e) = self.store.save(&record).await {
            warn!(key = self.store.key(), error = %e, "failed to persist refreshed token");
        }
        info!(
            authenticator = self.authenticator.id(),
            expires_in_secs = issued.expires_in_secs,
            "access token refreshed"
        );

        Ok(AccessToken {
            access_token: record.access_token,
            expires_in_secs: issued.expires_in_secs,
        })
    }
}
