//! Strategies for obtaining a fresh access token
//!
//! The token manager holds one `Authenticator`, chosen when the client is
//! built:
//! - `ExchangeAuthenticator` runs the gateway's own authorize + token login
//! - `CustomAuthenticator` hands the job to a caller-supplied async hook,
//!   for deployments where tokens are brokered by another service

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use common::{Envelope, Secret};
use gateway::Transport;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::exchange::{lenient_i64, login_authorize, login_token};

/// A freshly issued token and its lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in_secs: i64,
}

/// Boxed future returned by `Authenticator::authenticate`.
pub type AuthFuture<'a> = Pin<Box<dyn Future<Output = Result<IssuedToken>> + Send + 'a>>;

/// Obtains a new access token.
///
/// `current_token` is the cached token, possibly stale, if there is one.
/// Uses `Pin<Box<dyn Future>>` for dyn-compatibility (`Arc<dyn Authenticator>`).
pub trait Authenticator: Send + Sync {
    /// Identifier for logging (e.g. "exchange", "custom")
    fn id(&self) -> &str;

    fn authenticate<'a>(&'a self, current_token: Option<&'a str>) -> AuthFuture<'a>;
}

/// Built-in two-step login against the gateway.
pub struct ExchangeAuthenticator {
    transport: Transport,
    app_id: String,
    app_secret: Secret<String>,
}

impl ExchangeAuthenticator {
    pub fn new(transport: Transport, app_id: impl Into<String>, app_secret: Secret<String>) -> Self {
        Self {
            transport,
            app_id: app_id.into(),
            app_secret,
        }
    }
}

impl Authenticator for ExchangeAuthenticator {
    fn id(&self) -> &str {
        "exchange"
    }

    fn authenticate<'a>(&'a self, _current_token: Option<&'a str>) -> AuthFuture<'a> {
        Box::pin(async move {
            let code = login_authorize(&self.transport, &self.app_id, "").await?;
            let grant = login_token(
                &self.transport,
                &self.app_id,
                self.app_secret.expose(),
                &code.code,
            )
            .await?;
            Ok(IssuedToken {
                access_token: grant.access_token,
                expires_in_secs: grant.expires_in_secs,
            })
        })
    }
}

/// Payload passed to a custom authentication hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomAuthRequest {
    /// Currently cached token, empty when nothing is cached
    pub access_token: String,
}

/// Caller-supplied hook: `(custom_auth_url, request) -> envelope`.
pub type CustomAuthFn = Arc<
    dyn Fn(String, CustomAuthRequest) -> Pin<Box<dyn Future<Output = Envelope> + Send>>
        + Send
        + Sync,
>;

/// Box an async closure into a `CustomAuthFn`.
pub fn boxed_hook<F, Fut>(hook: F) -> CustomAuthFn
where
    F: Fn(String, CustomAuthRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Envelope> + Send + 'static,
{
    Arc::new(move |url: String, request: CustomAuthRequest| {
        let fut: Pin<Box<dyn Future<Output = Envelope> + Send>> = Box::pin(hook(url, request));
        fut
    })
}

/// Delegates token issuance to a caller-supplied hook.
///
/// A `"0000"` envelope must carry `data.access_token` and `data.expire_time`
/// (lifetime in seconds). Any other envelope fails with its own code and
/// message.
pub struct CustomAuthenticator {
    url: String,
    hook: CustomAuthFn,
}

impl CustomAuthenticator {
    pub fn new<F, Fut>(url: impl Into<String>, hook: F) -> Self
    where
        F: Fn(String, CustomAuthRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Envelope> + Send + 'static,
    {
        Self::from_fn(url, boxed_hook(hook))
    }

    pub fn from_fn(url: impl Into<String>, hook: CustomAuthFn) -> Self {
        Self {
            url: url.into(),
            hook,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Authenticator for CustomAuthenticator {
    fn id(&self) -> &str {
        "custom"
    }

    fn authenticate<'a>(&'a self, current_token: Option<&'a str>) -> AuthFuture<'a> {
        Box::pin(async move {
            let request = CustomAuthRequest {
                access_token: current_token.unwrap_or_default().to_string(),
            };
            let envelope = (self.hook)(self.url.clone(), request).await;
            if !envelope.is_success() {
                return Err(Error::Rejected {
                    code: envelope.code,
                    message: envelope.message,
                });
            }

            let access_token = envelope
                .data
                .get("access_token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| {
                    Error::InvalidResponse("custom authenticator returned no access_token".into())
                })?
                .to_string();
            let expires_in_secs = envelope
                .data
                .get("expire_time")
                .and_then(lenient_i64)
                .ok_or_else(|| {
                    Error::InvalidResponse("custom authenticator returned no expire_time".into())
                })?;

            debug!(url = %self.url, expires_in_secs, "custom authenticator issued token");
            Ok(IssuedToken {
                access_token,
                expires_in_secs,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{AUTHORIZE_PATH, TOKEN_PATH};
    use crate::credentials::{CredentialRecord, now_secs};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn exchange_runs_both_steps() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AUTHORIZE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "0000", "message": "ok",
                "authorizeCode": {"authorizeCode": "AC1", "stat": ""}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "0000", "message": "ok",
                "accessToken": {"accessToken": "T2", "expireIn": 7_200_000}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let auth = ExchangeAuthenticator::new(
            Transport::new(server.uri()).unwrap(),
            "app-1",
            Secret::from("sec"),
        );
        let issued = auth.authenticate(None).await.unwrap();
        assert_eq!(auth.id(), "exchange");
        assert_eq!(
            issued,
            IssuedToken {
                access_token: "T2".into(),
                expires_in_secs: 7200
            }
        );
    }

    #[tokio::test]
    async fn exchange_stops_after_failed_authorize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(AUTHORIZE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": "1001", "message": "应用不存在"})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let auth = ExchangeAuthenticator::new(
            Transport::new(server.uri()).unwrap(),
            "app-1",
            Secret::from("sec"),
        );
        let err = auth.authenticate(None).await.unwrap_err();
        assert_eq!(err.to_string(), "应用不存在");
    }

    #[tokio::test]
    async fn custom_hook_receives_url_and_current_token() {
        let auth = CustomAuthenticator::new("https://broker.test/token", |url, req| async move {
            assert_eq!(url, "https://broker.test/token");
            assert_eq!(req.access_token, "OLD");
            Envelope::success("ok", json!({"access_token": "NEW", "expire_time": "600"}))
        });

        let issued = auth.authenticate(Some("OLD")).await.unwrap();
        assert_eq!(auth.id(), "custom");
        assert_eq!(issued.access_token, "NEW");
        assert_eq!(issued.expires_in_secs, 600);
    }

    #[tokio::test]
    async fn custom_hook_failure_keeps_its_code() {
        let auth = CustomAuthenticator::new("u", |_, _| async {
            Envelope::new("3001", "broker unavailable", json!({}))
        });
        let err = auth.authenticate(None).await.unwrap_err();
        assert_eq!(err.code(), "3001");
        assert_eq!(err.to_string(), "broker unavailable");
    }

    #[tokio::test]
    async fn custom_hook_extreme_expire_time_is_stored_saturated() {
        let auth = CustomAuthenticator::new("u", |_, _| async {
            Envelope::success("ok", json!({"access_token": "NEW", "expire_time": i64::MAX}))
        });
        let issued = auth.authenticate(None).await.unwrap();
        assert_eq!(issued.expires_in_secs, i64::MAX);

        let record = CredentialRecord::issued(issued.access_token, issued.expires_in_secs, now_secs());
        assert_eq!(record.expire_time, i64::MAX);
    }

    #[tokio::test]
    async fn custom_hook_success_without_token_is_invalid() {
        let auth = CustomAuthenticator::new("u", |_, _| async {
            Envelope::success("ok", json!({"expire_time": 60}))
        });
        let err = auth.authenticate(None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(err.code(), "2000");
    }
}
