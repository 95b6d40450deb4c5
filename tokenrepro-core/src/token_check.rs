// tokenrepro-core/src/token_check.rs

use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info};

use crate::Error;
use crate::busy::BusyFlag;
use crate::http::{bearer_headers, HttpClient};
use crate::logs::LogStore;
use crate::models::LogEntry;
use crate::traits::{IdentitySession, Notifier};

pub const OAUTH_TOKEN_PATH: &str = "/api/oauth-token";

#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// No signed-in user; nothing was sent.
    Skipped,
    /// A check is already running.
    Busy,
    Recorded(LogEntry),
}

/// Calls the backend token endpoint with the session's bearer credential
/// and records exactly one log entry per attempt.
pub struct TokenCheckClient {
    http: Arc<dyn HttpClient>,
    session: Arc<dyn IdentitySession>,
    logs: Arc<LogStore>,
    notifier: Arc<dyn Notifier>,
    endpoint: String,
    checking: BusyFlag,
}

impl TokenCheckClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        session: Arc<dyn IdentitySession>,
        logs: Arc<LogStore>,
        notifier: Arc<dyn Notifier>,
        api_url: &str,
    ) -> Self {
        Self {
            http,
            session,
            logs,
            notifier,
            endpoint: format!("{}{}", api_url.trim_end_matches('/'), OAUTH_TOKEN_PATH),
            checking: BusyFlag::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_checking(&self) -> bool {
        self.checking.is_busy()
    }

    pub async fn check_token(&self, user_id: Option<&str>) -> CheckOutcome {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            return CheckOutcome::Skipped;
        };
        let Some(_checking) = self.checking.try_acquire() else {
            return CheckOutcome::Busy;
        };

        let entry = match self.fetch().await {
            Ok(body) => LogEntry::from_response(body, Some(user_id.to_string())),
            Err(e) => {
                error!("Token check failed: {}", e);
                self.notifier.alert("Error", "Failed to check token");
                LogEntry::network_error(e.to_string(), Some(user_id.to_string()))
            }
        };
        info!("Token check recorded: id={} success={}", entry.id, entry.success);

        self.logs.append(entry.clone()).await;
        CheckOutcome::Recorded(entry)
    }

    /// One GET with a freshly minted credential. The body is parsed whatever
    /// the status is.
    async fn fetch(&self) -> Result<Value, Error> {
        let token = self.session.get_token().await?.unwrap_or_default();
        let response = self
            .http
            .get(self.endpoint.clone(), bearer_headers(&token))
            .await?;
        response.json::<Value>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockHttpClient};
    use crate::models::SessionUser;
    use crate::storage::MemoryKeyValueStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSession {
        token_calls: AtomicUsize,
    }

    #[async_trait]
    impl IdentitySession for CountingSession {
        async fn set_active(&self, _session_id: &str) -> Result<(), Error> {
            Ok(())
        }
        async fn is_signed_in(&self) -> bool {
            true
        }
        async fn get_token(&self) -> Result<Option<String>, Error> {
            let n = self.token_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(format!("jwt-{}", n)))
        }
        async fn current_user(&self) -> Result<Option<SessionUser>, Error> {
            Ok(Some(SessionUser::new("user_1")))
        }
        async fn sign_out(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        alerts: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn alert(&self, title: &str, message: &str) {
            self.alerts.lock().unwrap().push((title.into(), message.into()));
        }
    }

    struct Harness {
        client: TokenCheckClient,
        logs: Arc<LogStore>,
        notifier: Arc<RecordingNotifier>,
        session: Arc<CountingSession>,
    }

    fn harness(http: MockHttpClient) -> Harness {
        let logs = Arc::new(LogStore::new(Arc::new(MemoryKeyValueStore::new())));
        let notifier = Arc::new(RecordingNotifier::default());
        let session = Arc::new(CountingSession::default());
        let client = TokenCheckClient::new(
            Arc::new(http),
            session.clone(),
            logs.clone(),
            notifier.clone(),
            "http://backend.test/",
        );
        Harness { client, logs, notifier, session }
    }

    fn respond(status: u16, body: Value) -> Result<HttpResponse, Error> {
        Ok(HttpResponse {
            status,
            body: body.to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn success_body_is_recorded_verbatim() {
        let body = json!({
            "success": true,
            "tokens": [{"provider": "oauth_tiktok", "token": "act.123"}],
            "timestamp": "2025-01-01T00:00:00.000Z",
        });
        let expected = body.clone();

        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url, headers| {
                url == "http://backend.test/api/oauth-token"
                    && headers.get("Authorization").map(String::as_str) == Some("Bearer jwt-0")
            })
            .times(1)
            .returning(move |_, _| respond(200, body.clone()));

        let h = harness(http);
        let outcome = h.client.check_token(Some("user_1")).await;

        let CheckOutcome::Recorded(entry) = outcome else {
            panic!("expected a recorded entry");
        };
        assert!(entry.success);
        assert_eq!(entry.response, expected);
        assert_eq!(entry.user_id.as_deref(), Some("user_1"));
        assert_eq!(h.logs.entries().await, vec![entry]);
        assert!(h.notifier.alerts.lock().unwrap().is_empty());
        assert!(!h.client.is_checking());
    }

    #[tokio::test]
    async fn error_status_body_is_parsed_and_missing_success_is_false() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .returning(|_, _| respond(429, json!({"error": {"status": 429}, "code": "rate_limited"})));

        let h = harness(http);
        let CheckOutcome::Recorded(entry) = h.client.check_token(Some("user_1")).await else {
            panic!("expected a recorded entry");
        };
        assert!(!entry.success);
        assert_eq!(entry.code(), Some("rate_limited"));
        assert!(h.notifier.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_records_network_error_and_alerts() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .returning(|_, _| Err(Error::Storage("connection refused".into())));

        let h = harness(http);
        let CheckOutcome::Recorded(entry) = h.client.check_token(Some("user_1")).await else {
            panic!("expected a recorded entry");
        };
        assert!(!entry.success);
        assert_eq!(entry.response["error"], "Network error");
        assert_eq!(h.logs.len().await, 1);
        assert_eq!(
            h.notifier.alerts.lock().unwrap().as_slice(),
            &[("Error".to_string(), "Failed to check token".to_string())]
        );
        assert!(!h.client.is_checking());
    }

    #[tokio::test]
    async fn unparseable_body_is_a_network_error() {
        let mut http = MockHttpClient::new();
        http.expect_get().returning(|_, _| {
            Ok(HttpResponse {
                status: 502,
                body: "<html>Bad Gateway</html>".into(),
                ..Default::default()
            })
        });

        let h = harness(http);
        let CheckOutcome::Recorded(entry) = h.client.check_token(Some("user_1")).await else {
            panic!("expected a recorded entry");
        };
        assert_eq!(entry.response["error"], "Network error");
        assert_eq!(h.logs.len().await, 1);
    }

    #[tokio::test]
    async fn no_user_is_a_no_op() {
        let mut http = MockHttpClient::new();
        http.expect_get().times(0);

        let h = harness(http);
        assert_eq!(h.client.check_token(None).await, CheckOutcome::Skipped);
        assert_eq!(h.client.check_token(Some("")).await, CheckOutcome::Skipped);
        assert!(h.logs.is_empty().await);
        assert_eq!(h.session.token_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn credential_is_minted_on_every_call() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .times(2)
            .returning(|_, _| respond(200, json!({"success": true, "tokens": []})));

        let h = harness(http);
        h.client.check_token(Some("user_1")).await;
        h.client.check_token(Some("user_1")).await;
        assert_eq!(h.session.token_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.logs.len().await, 2);
    }
}
