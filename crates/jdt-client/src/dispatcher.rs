//! Authenticated dispatch with one re-authentication
//!
//! State machine for a single logical call:
//! - SEND (transport retries inside) → RECEIVED
//! - RECEIVED with a token-expired code on an authenticated call →
//!   REAUTH → SEND → RECEIVED, which is terminal
//! - RECEIVED otherwise → terminal
//!
//! Transport failures surface as `Error::Gateway` and are turned into a
//! failure envelope by the caller; nothing here retries without bound.

use std::sync::Arc;

use common::business_code;
use gateway::{Form, Transport};
use jdt_auth::TokenManager;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::error::Result;

/// Business codes meaning the access token is expired or invalid.
pub const TOKEN_EXPIRED_CODES: &[&str] = &["30004", "400"];

/// Form field carrying the access token on authenticated calls.
pub const ACCESS_TOKEN_FIELD: &str = "accessToken";

/// Whether a parsed gateway response reports a rejected token.
pub fn is_token_expired(response: &Value) -> bool {
    business_code(response).is_some_and(|code| TOKEN_EXPIRED_CODES.contains(&code.as_str()))
}

/// Sends gateway requests, attaching and refreshing the access token.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Transport,
    tokens: Arc<TokenManager>,
}

impl Dispatcher {
    pub fn new(transport: Transport, tokens: Arc<TokenManager>) -> Self {
        Self { transport, tokens }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    /// POST `form` to `path` and return the parsed response body.
    ///
    /// With `requires_auth` the current token is added as `accessToken`. If
    /// the gateway answers with a token-expired code, the token is refreshed
    /// once and the request re-sent once; that second answer is returned
    /// whatever it says.
    #[instrument(skip_all, fields(path = %path, requires_auth = requires_auth))]
    pub async fn post(
        &self,
        path: &str,
        mut form: Form,
        headers: HeaderMap,
        requires_auth: bool,
    ) -> Result<Value> {
        if !requires_auth {
            return Ok(self.transport.post_form(path, &form, &headers).await?);
        }

        let token = self.tokens.access_token(false).await?;
        form.set(ACCESS_TOKEN_FIELD, &token.access_token);
        let response = self.transport.post_form(path, &form, &headers).await?;
        if !is_token_expired(&response) {
            return Ok(response);
        }

        warn!(code = ?business_code(&response), "access token rejected, re-authenticating");
        metrics::counter!("jdt_reauth_total").increment(1);
        let fresh = self.tokens.refresh_rejected(&token.access_token).await?;
        form.set(ACCESS_TOKEN_FIELD, &fresh.access_token);

        let retried = self.transport.post_form(path, &form, &headers).await?;
        if is_token_expired(&retried) {
            warn!("access token rejected again after re-authentication, giving up");
        } else {
            debug!("request succeeded after re-authentication");
        }
        Ok(retried)
    }
}
