// tokenrepro-core/src/platforms/clerk/frontend.rs
//
// Client-side adapter over the Frontend API, acting as a native client:
// requests carry `_is_native=1` and the client credential travels in the
// Authorization header in both directions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::Error;
use crate::auth::callback_server::{redirect_url, start_callback_server, CallbackResult};
use crate::http::{HttpClient, HttpResponse};
use crate::models::{ExternalAccount, SessionUser};
use crate::traits::{IdentitySession, SsoFlow, SsoOutcome, TokenCache};

pub const CLIENT_JWT_KEY: &str = "__clerk_client_jwt";

/// Sends the user to the external verification URL.
pub type BrowserOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

fn system_browser() -> BrowserOpener {
    Arc::new(|url: &str| open::that(url))
}

/// Frontend API responses wrap the resource in `response`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    response: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientResource {
    #[serde(default)]
    sessions: Vec<SessionResource>,
    #[serde(default)]
    last_active_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionResource {
    id: String,
    #[serde(default)]
    user: Option<UserResource>,
}

#[derive(Debug, Deserialize)]
struct UserResource {
    id: String,
    #[serde(default)]
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailResource>,
    #[serde(default)]
    external_accounts: Vec<ExternalAccountResource>,
}

#[derive(Debug, Deserialize)]
struct EmailResource {
    id: String,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct ExternalAccountResource {
    provider: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    email_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SignInResource {
    id: String,
    #[serde(default)]
    created_session_id: Option<String>,
    #[serde(default)]
    first_factor_verification: Option<VerificationResource>,
}

#[derive(Debug, Deserialize)]
struct VerificationResource {
    #[serde(default)]
    external_verification_redirect_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResource {
    jwt: String,
}

impl From<UserResource> for SessionUser {
    fn from(user: UserResource) -> Self {
        let primary_email = user.primary_email_address_id.as_ref().and_then(|primary| {
            user.email_addresses
                .iter()
                .find(|e| &e.id == primary)
                .map(|e| e.email_address.clone())
        });
        let external_accounts = user
            .external_accounts
            .into_iter()
            .map(|a| ExternalAccount {
                provider: a.provider.strip_prefix("oauth_").unwrap_or(&a.provider).to_string(),
                username: a.username,
                email_address: a.email_address,
            })
            .collect();
        SessionUser {
            id: user.id,
            primary_email,
            external_accounts,
        }
    }
}

pub struct ClerkFrontend {
    http: Arc<dyn HttpClient>,
    frontend_api: String,
    token_cache: Arc<dyn TokenCache>,
    callback_port: u16,
    opener: BrowserOpener,
    active_session: RwLock<Option<String>>,
}

impl ClerkFrontend {
    pub fn new(
        http: Arc<dyn HttpClient>,
        frontend_api_url: &str,
        token_cache: Arc<dyn TokenCache>,
        callback_port: u16,
    ) -> Self {
        Self {
            http,
            frontend_api: frontend_api_url.trim_end_matches('/').to_string(),
            token_cache,
            callback_port,
            opener: system_browser(),
            active_session: RwLock::new(None),
        }
    }

    /// Replaces the system browser, e.g. to print the URL instead.
    pub fn with_browser_opener(mut self, opener: BrowserOpener) -> Self {
        self.opener = opener;
        self
    }

    pub async fn active_session_id(&self) -> Option<String> {
        self.active_session.read().await.clone()
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}?_is_native=1", self.frontend_api, path);
        for (k, v) in query {
            url.push_str(&format!("&{}={}", k, urlencoding::encode(v)));
        }
        url
    }

    fn client_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        match self.token_cache.get_token(CLIENT_JWT_KEY) {
            Ok(Some(jwt)) => {
                headers.insert("Authorization".to_string(), jwt);
            }
            Ok(None) => {}
            Err(e) => warn!("Could not read client credential: {}", e),
        }
        headers
    }

    /// Keeps the rotated client credential the Frontend API hands back.
    fn absorb(&self, response: HttpResponse) -> Result<HttpResponse, Error> {
        if let Some(jwt) = response.header("authorization").filter(|j| !j.is_empty()) {
            if let Err(e) = self.token_cache.save_token(CLIENT_JWT_KEY, jwt) {
                warn!("Could not store client credential: {}", e);
            }
        }
        if !response.is_success() {
            return Err(Error::upstream(response.status, &response.body));
        }
        Ok(response)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, Error> {
        let response = self.http.get(self.url(path, query), self.client_headers()).await?;
        self.absorb(response)?.json()
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, form: Vec<(String, String)>) -> Result<T, Error> {
        let response = self
            .http
            .post_form(self.url(path, &[]), self.client_headers(), form)
            .await?;
        self.absorb(response)?.json()
    }

    async fn client(&self) -> Result<ClientResource, Error> {
        let envelope: Envelope<ClientResource> = self.get("/v1/client", &[]).await?;
        Ok(envelope.response.unwrap_or_default())
    }

    /// Picks the last active session back up from a cached client
    /// credential. Returns the session id when one was restored.
    pub async fn restore(&self) -> Result<Option<String>, Error> {
        if self.token_cache.get_token(CLIENT_JWT_KEY)?.is_none() {
            return Ok(None);
        }
        let client = self.client().await?;
        let restored = client
            .last_active_session_id
            .filter(|id| client.sessions.iter().any(|s| &s.id == id));
        if let Some(id) = &restored {
            info!("Restored session {}", id);
        }
        *self.active_session.write().await = restored.clone();
        Ok(restored)
    }

    async fn run_sso(
        &self,
        strategy: &str,
        callback: tokio::sync::oneshot::Receiver<CallbackResult>,
    ) -> Result<SsoOutcome, Error> {
        let form = vec![
            ("strategy".to_string(), strategy.to_string()),
            ("redirect_url".to_string(), redirect_url(self.callback_port)),
        ];
        let envelope: Envelope<SignInResource> = self.post("/v1/client/sign_ins", form).await?;
        let sign_in = envelope
            .response
            .ok_or_else(|| Error::Auth("Sign-in attempt was not created".into()))?;

        let external_url = sign_in
            .first_factor_verification
            .and_then(|v| v.external_verification_redirect_url)
            .ok_or_else(|| Error::Auth(format!("No redirect URL for strategy {}", strategy)))?;

        info!("Opening browser for {}", strategy);
        if let Err(e) = (self.opener)(&external_url) {
            warn!("Could not open a browser ({}); visit {}", e, external_url);
        }

        let result = callback
            .await
            .map_err(|_| Error::Cancelled("callback server stopped before the redirect".into()))?;
        if let Some(err) = result.error {
            return Err(Error::Cancelled(err));
        }
        if result.created_session_id.is_some() {
            return Ok(SsoOutcome {
                created_session_id: result.created_session_id,
            });
        }

        // The redirect only carried a nonce: reload the attempt to learn
        // which session it created.
        let mut query = Vec::new();
        if let Some(nonce) = result.rotating_token_nonce.as_deref() {
            query.push(("rotating_token_nonce", nonce));
        }
        let reloaded: Envelope<SignInResource> = self
            .get(&format!("/v1/client/sign_ins/{}", sign_in.id), &query)
            .await?;
        debug!("Reloaded sign-in {}", sign_in.id);
        Ok(SsoOutcome {
            created_session_id: reloaded.response.and_then(|s| s.created_session_id),
        })
    }
}

#[async_trait]
impl SsoFlow for ClerkFrontend {
    async fn start_sso_flow(&self, strategy: &str) -> Result<SsoOutcome, Error> {
        let (callback, shutdown) = start_callback_server(self.callback_port).await?;
        let result = self.run_sso(strategy, callback).await;
        let _ = shutdown.send(());
        result
    }
}

#[async_trait]
impl IdentitySession for ClerkFrontend {
    async fn set_active(&self, session_id: &str) -> Result<(), Error> {
        let path = format!("/v1/client/sessions/{}/touch", session_id);
        let _: Envelope<serde_json::Value> = self.post(&path, Vec::new()).await?;
        *self.active_session.write().await = Some(session_id.to_string());
        Ok(())
    }

    async fn is_signed_in(&self) -> bool {
        self.active_session.read().await.is_some()
    }

    async fn get_token(&self) -> Result<Option<String>, Error> {
        let Some(session_id) = self.active_session_id().await else {
            return Ok(None);
        };
        let path = format!("/v1/client/sessions/{}/tokens", session_id);
        let token: TokenResource = self.post(&path, Vec::new()).await?;
        Ok(Some(token.jwt))
    }

    async fn current_user(&self) -> Result<Option<SessionUser>, Error> {
        let Some(session_id) = self.active_session_id().await else {
            return Ok(None);
        };
        let client = self.client().await?;
        Ok(client
            .sessions
            .into_iter()
            .find(|s| s.id == session_id)
            .and_then(|s| s.user)
            .map(SessionUser::from))
    }

    async fn sign_out(&self) -> Result<(), Error> {
        let ended = match self.active_session.write().await.take() {
            Some(session_id) => {
                let path = format!("/v1/client/sessions/{}/end", session_id);
                self.post::<Envelope<serde_json::Value>>(&path, Vec::new()).await.map(|_| ())
            }
            None => Ok(()),
        };
        self.token_cache.clear_token(CLIENT_JWT_KEY)?;
        ended
    }
}
