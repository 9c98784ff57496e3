//! Client construction, token access and the shared business-call path

use std::future::Future;
use std::sync::Arc;

use common::{Envelope, FAILURE, SUCCESS, empty_data};
use gateway::{DEFAULT_BASE_URL, Form, RetryPolicy, Transport};
use jdt_auth::{
    Authenticator, AuthSettings, Cache, CredentialStore, CustomAuthFn, CustomAuthRequest,
    CustomAuthenticator, DiskCache, ExchangeAuthenticator, TokenManager, boxed_hook,
};
use reqwest::header::HeaderMap;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::error::Result;

/// Metrics label for ad-hoc `call` paths.
const CALL_ENDPOINT: &str = "call";

/// Builds a [`JdtClient`].
pub struct JdtClientBuilder {
    settings: AuthSettings,
    base_url: Option<String>,
    retry: RetryPolicy,
    cache: Option<Arc<dyn Cache>>,
    custom_auth: Option<CustomAuthFn>,
}

impl JdtClientBuilder {
    /// Point at another gateway host (staging, mock servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use this store for the credential record instead of a `DiskCache`
    /// rooted at `settings.disk`.
    pub fn cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Obtain tokens from `hook` instead of the built-in two-step login.
    ///
    /// The hook receives `custom_auth_url` and the currently cached token and
    /// must answer with an envelope carrying `access_token` and `expire_time`.
    pub fn custom_auth<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(String, CustomAuthRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Envelope> + Send + 'static,
    {
        self.custom_auth = Some(boxed_hook(hook));
        self
    }

    pub fn build(self) -> Result<JdtClient> {
        let transport = Transport::new(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?
            .with_retry_policy(self.retry);

        let authenticator: Arc<dyn Authenticator> = match self.custom_auth {
            Some(hook) => Arc::new(CustomAuthenticator::from_fn(
                self.settings.custom_auth_url.clone().unwrap_or_default(),
                hook,
            )),
            None => {
                if self.settings.custom_auth_url.is_some() {
                    warn!("custom_auth_url is set but no custom auth hook was supplied, using built-in login");
                }
                Arc::new(ExchangeAuthenticator::new(
                    transport.clone(),
                    self.settings.app_id.clone(),
                    self.settings.app_secret.clone(),
                ))
            }
        };

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(DiskCache::new(self.settings.disk.clone())));
        let store = CredentialStore::new(cache, self.settings.auth_file.clone());
        let tokens = TokenManager::new(self.settings, store, authenticator);
        debug!(
            base_url = transport.base_url(),
            authenticator = tokens.authenticator_id(),
            "jdt client ready"
        );

        Ok(JdtClient {
            dispatcher: Dispatcher::new(transport, Arc::new(tokens)),
        })
    }
}

/// Async client for the gateway. Cheap to clone; clones share the token
/// cache and refresh lock.
#[derive(Clone)]
pub struct JdtClient {
    dispatcher: Dispatcher,
}

impl JdtClient {
    pub fn builder(settings: AuthSettings) -> JdtClientBuilder {
        JdtClientBuilder {
            settings,
            base_url: None,
            retry: RetryPolicy::default(),
            cache: None,
            custom_auth: None,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub(crate) fn settings(&self) -> &AuthSettings {
        self.dispatcher.tokens().settings()
    }

    /// Current access token, refreshed when close to expiry or when `force`.
    ///
    /// Success data is `{access_token, expire_time}` with `expire_time` the
    /// remaining lifetime in seconds.
    pub async fn get_access_token(&self, force: bool) -> Envelope {
        match self.dispatcher.tokens().access_token(force).await {
            Ok(token) => token.to_envelope(),
            Err(e) => e.into(),
        }
    }

    /// First login step. Success data is `{authorization_code, stat}`.
    pub async fn login_authorize(&self, state: &str) -> Envelope {
        let settings = self.settings();
        if let Err(e) = settings.validate() {
            return e.into();
        }
        match jdt_auth::login_authorize(self.dispatcher.transport(), &settings.app_id, state).await
        {
            Ok(code) => Envelope::success(
                code.message,
                json!({"authorization_code": code.code, "stat": code.stat}),
            ),
            Err(e) => e.into(),
        }
    }

    /// Second login step. Success data is `{access_token, expire_time}` with
    /// `expire_time` the token lifetime in seconds.
    ///
    /// The issued token is returned as is; it is not written to the cache.
    pub async fn login_token(&self, authorization_code: &str) -> Envelope {
        let settings = self.settings();
        if let Err(e) = settings.validate() {
            return e.into();
        }
        match jdt_auth::login_token(
            self.dispatcher.transport(),
            &settings.app_id,
            settings.app_secret.expose(),
            authorization_code,
        )
        .await
        {
            Ok(grant) => Envelope::success(
                grant.message,
                json!({"access_token": grant.access_token, "expire_time": grant.expires_in_secs}),
            ),
            Err(e) => e.into(),
        }
    }

    /// Authenticated POST to any gateway path, mapped like the named
    /// operations.
    pub async fn call(&self, path: &str, form: Form) -> Envelope {
        self.business(CALL_ENDPOINT, path, form, HeaderMap::new()).await
    }

    /// `endpoint` labels metrics; it must come from a fixed set of names.
    pub(crate) async fn business(
        &self,
        endpoint: &'static str,
        path: &str,
        form: Form,
        headers: HeaderMap,
    ) -> Envelope {
        let (outcome, envelope) = match self.dispatcher.post(path, form, headers, true).await {
            Ok(response) => {
                let envelope = business_envelope(&response);
                let outcome = if envelope.is_success() { "success" } else { "rejected" };
                (outcome, envelope)
            }
            Err(e) => {
                warn!(endpoint, path, error = %e, "gateway call failed");
                ("error", e.into())
            }
        };
        metrics::counter!(
            "jdt_requests_total",
            "endpoint" => endpoint,
            "outcome" => outcome
        )
        .increment(1);
        envelope
    }
}

/// Business responses carry an HTTP-style `code`: 200 is success, anything
/// else a failure.
pub(crate) fn business_envelope(response: &Value) -> Envelope {
    let ok = match response.get("code") {
        Some(Value::Number(n)) => n.as_i64() == Some(200),
        Some(Value::String(s)) => s.trim() == "200",
        _ => false,
    };
    let message = response
        .get("message")
        .or_else(|| response.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let data = response.get("data").cloned().unwrap_or_else(empty_data);
    Envelope::new(if ok { SUCCESS } else { FAILURE }, message, data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{AUTH_FILE, TestGateway, cached_record};
    use jdt_auth::{MemoryCache, Visibility, now_secs};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, ResponseTemplate};

    const ABILITY_PATH: &str = "/dataapp/api/umei/fw/open/wbjc/get_correct_ability";

    fn assert_envelope_keys(envelope: &Envelope) {
        let value = serde_json::to_value(envelope).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["code", "data", "message"]);
    }

    #[test]
    fn business_mapping() {
        let ok = business_envelope(&json!({"code": 200, "message": "成功", "data": [1, 2]}));
        assert_eq!(ok.code, "0000");
        assert_eq!(ok.message, "成功");
        assert_eq!(ok.data, json!([1, 2]));

        let failed = business_envelope(&json!({"code": 500, "msg": "服务异常"}));
        assert_eq!(failed.code, "2000");
        assert_eq!(failed.message, "服务异常");
        assert_eq!(failed.data, json!({}));

        let null_data = business_envelope(&json!({"code": "200", "data": null}));
        assert_eq!(null_data.code, "0000");
        assert_eq!(null_data.data, json!({}));
    }

    #[tokio::test]
    async fn cached_token_is_served_without_requests() {
        let gw = TestGateway::start(Some(cached_record("T0", 3600))).await;
        gw.expect_logins(0).await;

        let envelope = gw.client().get_access_token(false).await;
        assert_eq!(envelope.code, "0000");
        assert_eq!(envelope.message, "登录成功");
        assert_eq!(envelope.data["access_token"], "T0");
        assert!(envelope.data["expire_time"].as_i64().unwrap() > 3500);
        assert_eq!(gw.request_count().await, 0);
    }

    #[tokio::test]
    async fn missing_config_makes_no_requests() {
        let gw = TestGateway::start(None).await;
        let settings = AuthSettings::new("app-1", "sec", "", AUTH_FILE);
        let client = gw.client_with(settings);

        for envelope in [
            client.get_access_token(false).await,
            client.get_correct_ability().await,
            client.login_authorize("s").await,
        ] {
            assert_eq!(envelope.code, "2000");
            assert_eq!(envelope.message, "配置信息【disk】不能为空");
            assert_envelope_keys(&envelope);
        }
        assert_eq!(gw.request_count().await, 0);
    }

    #[tokio::test]
    async fn near_expiry_token_is_replaced_and_persisted() {
        let gw = TestGateway::start(Some(cached_record("T1", 100))).await;
        gw.issue_token("T2", 3_600_000, 1).await;

        let before = now_secs();
        let envelope = gw.client().get_access_token(false).await;
        assert_eq!(envelope.code, "0000");
        assert_eq!(envelope.message, "登录成功");
        assert_eq!(envelope.data["access_token"], "T2");

        let stored = gw.stored().await.unwrap();
        assert_eq!(stored.access_token, "T2");
        assert!(stored.expire_time >= before + 3600);
        assert!(stored.expire_time <= now_secs() + 3600);
    }

    #[tokio::test]
    async fn forced_refresh_ignores_a_fresh_cache() {
        let gw = TestGateway::start(Some(cached_record("T0", 3600))).await;
        gw.issue_token("T9", 7_200_000, 1).await;

        let envelope = gw.client().get_access_token(true).await;
        assert_eq!(envelope.data["access_token"], "T9");
        assert_eq!(envelope.data["expire_time"], 7200);
    }

    #[tokio::test]
    async fn login_steps_map_upstream_fields() {
        let gw = TestGateway::start(None).await;
        gw.issue_token("T5", 1_500, 1).await;
        let client = gw.client();

        let authorize = client.login_authorize("state-1").await;
        assert_eq!(authorize.code, "0000");
        assert_eq!(authorize.message, "获取成功");
        assert_eq!(authorize.data, json!({"authorization_code": "AC1", "stat": "1"}));

        let token = client.login_token("AC1").await;
        assert_eq!(token.code, "0000");
        assert_eq!(token.data, json!({"access_token": "T5", "expire_time": 1}));
        assert!(gw.stored().await.is_none());
    }

    #[tokio::test]
    async fn login_without_access_token_is_a_failure_and_not_cached() {
        let gw = TestGateway::start(None).await;
        Mock::given(method("POST"))
            .and(path(jdt_auth::AUTHORIZE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "0000",
                "message": "获取成功",
                "authorizeCode": {"authorizeCode": "AC1", "stat": "1"}
            })))
            .expect(1)
            .mount(&gw.server)
            .await;
        Mock::given(method("POST"))
            .and(path(jdt_auth::TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"code": "0000", "message": "ok"})),
            )
            .expect(1)
            .mount(&gw.server)
            .await;

        let envelope = gw.client().get_access_token(false).await;
        assert_eq!(envelope.code, "2000");
        assert!(gw.stored().await.is_none());
        assert_envelope_keys(&envelope);
    }

    /// Collects the labels of every `jdt_requests_total` registration.
    #[derive(Default)]
    struct RequestLabels(std::sync::Mutex<Vec<Vec<(String, String)>>>);

    impl metrics::Recorder for RequestLabels {
        fn describe_counter(
            &self,
            _: metrics::KeyName,
            _: Option<metrics::Unit>,
            _: metrics::SharedString,
        ) {
        }
        fn describe_gauge(
            &self,
            _: metrics::KeyName,
            _: Option<metrics::Unit>,
            _: metrics::SharedString,
        ) {
        }
        fn describe_histogram(
            &self,
            _: metrics::KeyName,
            _: Option<metrics::Unit>,
            _: metrics::SharedString,
        ) {
        }

        fn register_counter(
            &self,
            key: &metrics::Key,
            _: &metrics::Metadata<'_>,
        ) -> metrics::Counter {
            if key.name() == "jdt_requests_total" {
                let labels = key
                    .labels()
                    .map(|l| (l.key().to_string(), l.value().to_string()))
                    .collect();
                self.0.lock().unwrap().push(labels);
            }
            metrics::Counter::noop()
        }

        fn register_gauge(&self, _: &metrics::Key, _: &metrics::Metadata<'_>) -> metrics::Gauge {
            metrics::Gauge::noop()
        }

        fn register_histogram(
            &self,
            _: &metrics::Key,
            _: &metrics::Metadata<'_>,
        ) -> metrics::Histogram {
            metrics::Histogram::noop()
        }
    }

    #[test]
    fn request_metrics_are_labelled_by_endpoint_not_path() {
        let recorder = RequestLabels::default();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        metrics::with_local_recorder(&recorder, || {
            runtime.block_on(async {
                let gw = TestGateway::start(Some(cached_record("T0", 3600))).await;
                Mock::given(method("POST"))
                    .respond_with(
                        ResponseTemplate::new(200)
                            .set_body_json(json!({"code": 200, "message": "ok", "data": {}})),
                    )
                    .mount(&gw.server)
                    .await;

                let client = gw.client();
                client.get_correct_ability().await;
                client.call("/any/path/9f8e7d", Form::new()).await;
            })
        });

        let seen = recorder.0.lock().unwrap().clone();
        let endpoints: Vec<_> = seen
            .iter()
            .filter_map(|labels| labels.iter().find(|(k, _)| k == "endpoint"))
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(endpoints, ["get_correct_ability", "call"]);
        assert!(seen.iter().flatten().all(|(k, v)| k != "path" && !v.contains("9f8e7d")));
    }

    #[tokio::test]
    async fn rejected_login_keeps_upstream_message() {
        let gw = TestGateway::start(None).await;
        gw.reject_authorize("appId不存在").await;

        let envelope = gw.client().get_access_token(false).await;
        assert_eq!(envelope.code, "2000");
        assert_eq!(envelope.message, "appId不存在");
        assert_envelope_keys(&envelope);
    }

    #[tokio::test]
    async fn transport_failure_envelope_carries_status_and_trace() {
        let gw = TestGateway::start(Some(cached_record("T0", 3600))).await;
        Mock::given(method("POST"))
            .and(path(ABILITY_PATH))
            .respond_with(ResponseTemplate::new(502))
            .expect(3)
            .mount(&gw.server)
            .await;

        let envelope = gw.client().get_correct_ability().await;
        assert_eq!(envelope.code, "502");
        assert!(envelope.data["trace"].is_string());
        assert_envelope_keys(&envelope);
    }

    #[tokio::test]
    async fn call_reaches_arbitrary_paths() {
        let gw = TestGateway::start(Some(cached_record("T0", 3600))).await;
        Mock::given(method("POST"))
            .and(path("/dataapp/api/umei/fw/open/wbjc/get_leader"))
            .and(body_string_contains("page=2"))
            .and(body_string_contains("accessToken=T0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": 200, "message": "ok", "data": {"total": 0}})),
            )
            .expect(1)
            .mount(&gw.server)
            .await;

        let envelope = gw
            .client()
            .call("/dataapp/api/umei/fw/open/wbjc/get_leader", Form::new().field("page", 2))
            .await;
        assert_eq!(envelope.code, "0000");
        assert_eq!(envelope.data, json!({"total": 0}));
    }

    #[tokio::test]
    async fn custom_hook_replaces_built_in_login() {
        let gw = TestGateway::start(None).await;
        gw.expect_logins(0).await;
        let cache = Arc::new(MemoryCache::new());
        let settings = gw.settings().with_custom_auth_url("https://auth.internal/token");

        let client = JdtClient::builder(settings)
            .base_url(gw.server.uri())
            .cache(cache.clone())
            .custom_auth(|url: String, request: CustomAuthRequest| async move {
                assert_eq!(url, "https://auth.internal/token");
                assert_eq!(request.access_token, "");
                Envelope::success("ok", json!({"access_token": "C1", "expire_time": 3600}))
            })
            .build()
            .unwrap();

        let envelope = client.get_access_token(false).await;
        assert_eq!(envelope.data["access_token"], "C1");
        assert_eq!(cache.visibility(AUTH_FILE).await, Some(Visibility::Public));
    }

    #[tokio::test]
    async fn clones_share_the_refresh() {
        let gw = TestGateway::start(None).await;
        gw.issue_token("T1", 3_600_000, 1).await;
        let client = gw.client();

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let client = client.clone();
                tokio::spawn(async move { client.get_access_token(false).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().data["access_token"], "T1");
        }
    }
}
