//! Mock gateway fixtures shared by the client tests

use std::time::Duration;

use gateway::RetryPolicy;
use jdt_auth::{AUTHORIZE_PATH, AuthSettings, CredentialRecord, TOKEN_PATH, now_secs};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::client::JdtClient;
use crate::dispatcher::Dispatcher;

pub(crate) const AUTH_FILE: &str = "jdt/auth.json";

/// A record expiring `expires_in` seconds from now.
pub(crate) fn cached_record(token: &str, expires_in: i64) -> CredentialRecord {
    CredentialRecord {
        access_token: token.into(),
        expire_time: now_secs() + expires_in,
    }
}

/// Mock gateway plus a temp-dir credential cache.
pub(crate) struct TestGateway {
    pub server: MockServer,
    pub dir: TempDir,
}

impl TestGateway {
    pub async fn start(record: Option<CredentialRecord>) -> Self {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        if let Some(record) = record {
            let file = dir.path().join(AUTH_FILE);
            std::fs::create_dir_all(file.parent().unwrap()).unwrap();
            std::fs::write(&file, serde_json::to_string(&record).unwrap()).unwrap();
        }
        Self { server, dir }
    }

    pub fn settings(&self) -> AuthSettings {
        AuthSettings::new(
            "app-1",
            "sec",
            self.dir.path().to_string_lossy().into_owned(),
            AUTH_FILE,
        )
    }

    pub fn client_with(&self, settings: AuthSettings) -> JdtClient {
        JdtClient::builder(settings)
            .base_url(self.server.uri())
            .retry_policy(RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(10),
            })
            .build()
            .unwrap()
    }

    pub fn client(&self) -> JdtClient {
        self.client_with(self.settings())
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.client().dispatcher().clone()
    }

    /// Login mocks issuing `token` (authorization code `AC1`), each expected
    /// `times` times.
    pub async fn issue_token(&self, token: &str, expire_in_ms: i64, times: u64) {
        Mock::given(method("POST"))
            .and(path(AUTHORIZE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "0000",
                "message": "获取成功",
                "authorizeCode": {"authorizeCode": "AC1", "stat": "1"}
            })))
            .expect(times)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": "0000",
                "message": "获取成功",
                "accessToken": {"accessToken": token, "expireIn": expire_in_ms}
            })))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Assert the login endpoints are hit exactly `times` times.
    pub async fn expect_logins(&self, times: u64) {
        self.issue_token("UNUSED", 3_600_000, times).await;
    }

    pub async fn reject_authorize(&self, message: &str) {
        Mock::given(method("POST"))
            .and(path(AUTHORIZE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": "1001", "message": message})),
            )
            .expect(1)
            .mount(&self.server)
            .await;
    }

    /// The credential record currently on disk.
    pub async fn stored(&self) -> Option<CredentialRecord> {
        let contents = tokio::fs::read_to_string(self.dir.path().join(AUTH_FILE))
            .await
            .ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub async fn request_count(&self) -> usize {
        self.server.received_requests().await.unwrap_or_default().len()
    }
}
