// tokenrepro-core/src/platforms/clerk/backend.rs
//
// Server-side adapter: verifies session tokens against the instance JWKS
// and reads cached OAuth access tokens with the secret key.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::Error;
use crate::http::{bearer_headers, HttpClient};
use crate::models::{AuthContext, OAuthAccessToken, Platform};
use crate::traits::{OAuthTokenSource, RequestAuthenticator};

/// Clock skew tolerated on `exp` / `nbf`, in seconds.
const CLOCK_SKEW_LEEWAY: u64 = 5;

/// Minimum time between two JWKS fetches triggered by an unknown `kid`.
pub const JWKS_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    sid: Option<String>,
}

/// The token endpoint answers either with a bare array or with a
/// `{ data, total_count }` page depending on API version.
#[derive(Deserialize)]
#[serde(untagged)]
enum TokenList {
    Plain(Vec<OAuthAccessToken>),
    Paginated { data: Vec<OAuthAccessToken> },
}

struct CachedJwks {
    set: JwkSet,
    fetched_at: Instant,
}

pub struct ClerkBackend {
    http: Arc<dyn HttpClient>,
    api_url: String,
    secret_key: String,
    algorithms: Vec<Algorithm>,
    refetch_interval: Duration,
    jwks: RwLock<Option<CachedJwks>>,
}

impl ClerkBackend {
    pub fn new(http: Arc<dyn HttpClient>, api_url: &str, secret_key: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
            algorithms: vec![Algorithm::RS256],
            refetch_interval: JWKS_REFETCH_INTERVAL,
            jwks: RwLock::new(None),
        }
    }

    /// Restricts which signing algorithms are accepted. RS256 by default.
    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_jwks_refetch_interval(mut self, interval: Duration) -> Self {
        self.refetch_interval = interval;
        self
    }

    async fn fetch_jwks(&self) -> Result<JwkSet, Error> {
        let url = format!("{}/v1/jwks", self.api_url);
        let response = self.http.get(url, bearer_headers(&self.secret_key)).await?;
        if !response.is_success() {
            return Err(Error::upstream(response.status, &response.body));
        }
        response.json()
    }

    fn find_key(set: &JwkSet, kid: Option<&str>) -> Option<Jwk> {
        match kid {
            Some(kid) => set.find(kid).cloned(),
            None => set.keys.first().cloned(),
        }
    }

    /// Looks the key up in the cached set. A miss refetches the set so
    /// rotated keys are picked up, but at most once per refetch interval;
    /// unknown kids inside that window are rejected from the cache.
    async fn key_for(&self, kid: Option<&str>) -> Result<Option<Jwk>, Error> {
        if let Some(cached) = self.jwks.read().await.as_ref() {
            if let Some(jwk) = Self::find_key(&cached.set, kid) {
                return Ok(Some(jwk));
            }
            if cached.fetched_at.elapsed() < self.refetch_interval {
                debug!("kid={:?} not in the cached key set; refetch not due yet", kid);
                return Ok(None);
            }
        }

        let set = self.fetch_jwks().await?;
        let found = Self::find_key(&set, kid);
        *self.jwks.write().await = Some(CachedJwks {
            set,
            fetched_at: Instant::now(),
        });
        Ok(found)
    }
}

#[async_trait]
impl RequestAuthenticator for ClerkBackend {
    async fn authenticate_bearer(&self, bearer: Option<&str>) -> Result<Option<AuthContext>, Error> {
        let Some(token) = bearer.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let header = match decode_header(token) {
            Ok(h) => h,
            Err(e) => {
                debug!("Rejecting malformed session token: {}", e);
                return Ok(None);
            }
        };
        if !self.algorithms.contains(&header.alg) {
            debug!("Rejecting session token signed with {:?}", header.alg);
            return Ok(None);
        }

        let Some(jwk) = self.key_for(header.kid.as_deref()).await? else {
            warn!("No JWKS key matches kid={:?}", header.kid);
            return Ok(None);
        };
        let key = DecodingKey::from_jwk(&jwk)
            .map_err(|e| Error::Auth(format!("Unusable JWKS key: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.leeway = CLOCK_SKEW_LEEWAY;

        match decode::<SessionClaims>(token, &key, &validation) {
            Ok(data) => Ok(Some(AuthContext {
                user_id: data.claims.sub,
                session_id: data.claims.sid,
            })),
            Err(e) => {
                debug!("Session token rejected: {}", e);
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl OAuthTokenSource for ClerkBackend {
    async fn get_user_oauth_access_token(
        &self,
        user_id: &str,
        platform: &Platform,
    ) -> Result<Vec<OAuthAccessToken>, Error> {
        let url = format!(
            "{}/v1/users/{}/oauth_access_tokens/{}",
            self.api_url,
            urlencoding::encode(user_id),
            platform.strategy(),
        );
        let response = self.http.get(url, bearer_headers(&self.secret_key)).await?;
        if !response.is_success() {
            return Err(Error::upstream(response.status, &response.body));
        }

        Ok(match response.json::<TokenList>()? {
            TokenList::Plain(tokens) => tokens,
            TokenList::Paginated { data } => data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpResponse, MockHttpClient};
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    // 36 bytes: standard and url-safe base64 agree, no padding
    const SECRET: &[u8] = b"test-signing-secret-with-36-bytes!!!";

    fn ok(body: serde_json::Value) -> Result<HttpResponse, Error> {
        Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
            ..Default::default()
        })
    }

    fn jwks() -> serde_json::Value {
        json!({
            "keys": [{
                "kty": "oct",
                "kid": "ins_test",
                "alg": "HS256",
                "k": URL_SAFE_NO_PAD.encode(SECRET),
            }]
        })
    }

    fn session_token(sub: &str, exp_offset: i64) -> String {
        session_token_with_kid(sub, exp_offset, "ins_test")
    }

    fn session_token_with_kid(sub: &str, exp_offset: i64, kid: &str) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(kid.into());
        let now = chrono::Utc::now().timestamp();
        let claims = json!({
            "sub": sub,
            "sid": "sess_1",
            "iat": now,
            "nbf": now - 10,
            "exp": now + exp_offset,
        });
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn hs256_backend(http: MockHttpClient) -> ClerkBackend {
        ClerkBackend::new(Arc::new(http), "https://api.clerk.test/", "sk_test_secret")
            .with_algorithms(vec![Algorithm::HS256])
    }

    #[tokio::test]
    async fn fetches_tokens_with_secret_key() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url, headers| {
                url == "https://api.clerk.test/v1/users/user_1/oauth_access_tokens/oauth_tiktok"
                    && headers.get("Authorization").map(String::as_str) == Some("Bearer sk_test_secret")
            })
            .times(1)
            .returning(|_, _| {
                ok(json!([{
                    "object": "oauth_access_token",
                    "provider": "oauth_tiktok",
                    "token": "act.abc",
                    "scopes": ["user.info.basic"],
                    "label": null,
                }]))
            });

        let backend = ClerkBackend::new(Arc::new(http), "https://api.clerk.test/", "sk_test_secret");
        let tokens = backend
            .get_user_oauth_access_token("user_1", &Platform::TikTok)
            .await
            .unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token, "act.abc");
        assert_eq!(tokens[0].extra["object"], "oauth_access_token");
    }

    #[tokio::test]
    async fn accepts_paginated_token_lists() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .returning(|_, _| ok(json!({"data": [], "total_count": 0})));

        let backend = ClerkBackend::new(Arc::new(http), "https://api.clerk.test", "sk");
        let tokens = backend
            .get_user_oauth_access_token("user_1", &Platform::TikTok)
            .await
            .unwrap();
        assert!(tokens.is_empty());
    }

    #[tokio::test]
    async fn maps_error_bodies_to_upstream_errors() {
        let mut http = MockHttpClient::new();
        http.expect_get().returning(|_, _| {
            Ok(HttpResponse {
                status: 422,
                body: json!({"errors": [{"code": "oauth_missing_refresh_token", "message": "Cannot refresh"}]}).to_string(),
                ..Default::default()
            })
        });

        let backend = ClerkBackend::new(Arc::new(http), "https://api.clerk.test", "sk");
        let err = backend
            .get_user_oauth_access_token("user_1", &Platform::TikTok)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(422));
        assert_eq!(err.code(), Some("oauth_missing_refresh_token"));
    }

    #[tokio::test]
    async fn missing_or_malformed_bearer_is_unauthenticated() {
        let mut http = MockHttpClient::new();
        http.expect_get().times(0);

        let backend = hs256_backend(http);
        assert_eq!(backend.authenticate_bearer(None).await.unwrap(), None);
        assert_eq!(backend.authenticate_bearer(Some("  ")).await.unwrap(), None);
        assert_eq!(backend.authenticate_bearer(Some("null")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn valid_session_token_resolves_user_and_caches_jwks() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url, _| url == "https://api.clerk.test/v1/jwks")
            .times(1)
            .returning(|_, _| ok(jwks()));

        let backend = hs256_backend(http);
        let token = session_token("user_42", 60);

        let ctx = backend.authenticate_bearer(Some(&token)).await.unwrap().unwrap();
        assert_eq!(ctx.user_id, "user_42");
        assert_eq!(ctx.session_id.as_deref(), Some("sess_1"));

        // second call is served from the cached key set
        assert!(backend.authenticate_bearer(Some(&token)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_token_is_unauthenticated() {
        let mut http = MockHttpClient::new();
        http.expect_get().returning(|_, _| ok(jwks()));

        let backend = hs256_backend(http);
        let token = session_token("user_42", -600);
        assert_eq!(backend.authenticate_bearer(Some(&token)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn disallowed_algorithm_is_rejected_before_any_lookup() {
        let mut http = MockHttpClient::new();
        http.expect_get().times(0);

        // default backend only accepts RS256
        let backend = ClerkBackend::new(Arc::new(http), "https://api.clerk.test", "sk");
        let token = session_token("user_42", 60);
        assert_eq!(backend.authenticate_bearer(Some(&token)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_kids_do_not_refetch_within_interval() {
        let mut http = MockHttpClient::new();
        http.expect_get()
            .withf(|url, _| url == "https://api.clerk.test/v1/jwks")
            .times(1)
            .returning(|_, _| ok(jwks()));

        let backend = hs256_backend(http);
        for n in 0..20 {
            let forged = session_token_with_kid("user_42", 60, &format!("ins_forged_{}", n));
            assert_eq!(backend.authenticate_bearer(Some(&forged)).await.unwrap(), None);
        }

        // the genuine key is still served from the cache
        let token = session_token("user_42", 60);
        assert!(backend.authenticate_bearer(Some(&token)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_kid_refetches_once_interval_has_passed() {
        let mut http = MockHttpClient::new();
        http.expect_get().times(2).returning(|_, _| ok(jwks()));

        let backend = hs256_backend(http).with_jwks_refetch_interval(Duration::ZERO);
        let rotated = session_token_with_kid("user_42", 60, "ins_rotated");
        assert_eq!(backend.authenticate_bearer(Some(&rotated)).await.unwrap(), None);
        assert_eq!(backend.authenticate_bearer(Some(&rotated)).await.unwrap(), None);
    }
}
