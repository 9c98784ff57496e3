//! HTTP custom-auth hook
//!
//! When `custom_auth_url` is configured the binary obtains tokens by POSTing
//! the cached token as JSON to that URL. The endpoint answers with the same
//! `{code, message, data}` envelope the client produces.

use common::Envelope;
use gateway::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};
use jdt_auth::CustomAuthRequest;
use serde_json::json;
use tracing::warn;

pub fn client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}

/// Ask the custom auth endpoint for a token. Failures come back as envelopes.
pub async fn request_token(
    client: &reqwest::Client,
    url: &str,
    request: &CustomAuthRequest,
) -> Envelope {
    let response = match client.post(url).json(request).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!(url, error = %e, "custom auth endpoint unreachable");
            return Envelope::new("0", e.to_string(), json!({}));
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!(url, status = status.as_u16(), "custom auth endpoint returned an error status");
        return Envelope::new(
            status.as_u16().to_string(),
            format!("custom auth endpoint returned {status}"),
            json!({}),
        );
    }

    match response.json::<Envelope>().await {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(url, error = %e, "custom auth endpoint returned an unreadable body");
            Envelope::failure(format!("invalid custom auth response: {e}"))
        }
    }
}
