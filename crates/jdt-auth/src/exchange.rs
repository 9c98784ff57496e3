//! Two-step gateway login
//!
//! 1. `login_authorize` trades the app id for a one-time authorization code
//! 2. `login_token` trades app id, app secret and that code for an access token
//!
//! Both calls are unauthenticated and go straight to the transport; they
//! must never route through the token manager, which is what calls them.

use common::{FAILURE, SUCCESS, business_code};
use gateway::{Form, Transport};
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH};
use crate::error::{Error, Result};

/// Result of the authorize step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode {
    pub code: String,
    pub stat: String,
    /// Upstream message, passed through to the caller
    pub message: String,
}

/// Result of the token step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Token lifetime in seconds (the gateway reports milliseconds)
    pub expires_in_secs: i64,
    pub message: String,
}

/// Request a one-time authorization code.
///
/// Any business code other than `"0000"` fails with the generic `2000` code
/// and the upstream message.
pub async fn login_authorize(
    transport: &Transport,
    app_id: &str,
    state: &str,
) -> Result<AuthorizationCode> {
    let form = Form::new()
        .field("appId", app_id)
        .field("responseType", "code")
        .field("state", state);
    let response = transport
        .post_form(AUTHORIZE_PATH, &form, &HeaderMap::new())
        .await?;

    let message = message_of(&response);
    if business_code(&response).as_deref() != Some(SUCCESS) {
        warn!(code = ?business_code(&response), %message, "authorize step rejected");
        return Err(Error::Rejected {
            code: FAILURE.to_string(),
            message,
        });
    }

    debug!("authorization code issued");
    Ok(AuthorizationCode {
        code: string_at(&response, "/authorizeCode/authorizeCode"),
        stat: string_at(&response, "/authorizeCode/stat"),
        message,
    })
}

/// Exchange an authorization code for an access token.
///
/// `accessToken.expireIn` is milliseconds; it is truncated to whole seconds.
pub async fn login_token(
    transport: &Transport,
    app_id: &str,
    app_secret: &str,
    authorization_code: &str,
) -> Result<TokenGrant> {
    let form = Form::new()
        .field("appId", app_id)
        .field("appSecret", app_secret)
        .field("grantType", "authorization_code")
        .field("authorizeCode", authorization_code);
    let response = transport
        .post_form(TOKEN_PATH, &form, &HeaderMap::new())
        .await?;

    let message = message_of(&response);
    if business_code(&response).as_deref() != Some(SUCCESS) {
        warn!(code = ?business_code(&response), %message, "token step rejected");
        return Err(Error::Rejected {
            code: FAILURE.to_string(),
            message,
        });
    }

    let expire_in_ms = response
        .pointer("/accessToken/expireIn")
        .and_then(lenient_i64)
        .unwrap_or(0);
    let access_token = string_at(&response, "/accessToken/accessToken");
    if access_token.is_empty() {
        warn!(%message, "token step succeeded without an access token");
        return Err(Error::InvalidResponse(
            "token response carried no access token".into(),
        ));
    }
    Ok(TokenGrant {
        access_token,
        expires_in_secs: expire_in_ms / 1000,
        message,
    })
}

fn message_of(response: &Value) -> String {
    response
        .get("message")
        .or_else(|| response.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn string_at(response: &Value, pointer: &str) -> String {
    match response.pointer(pointer) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Integer from a JSON number or numeric string.
pub(crate) fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
