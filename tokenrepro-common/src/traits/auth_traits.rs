use async_trait::async_trait;

use crate::error::Error;
use crate::models::{AuthContext, OAuthAccessToken, Platform, SessionUser};

/// Result of a finished SSO round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsoOutcome {
    /// Set when the flow produced a session that can be activated.
    pub created_session_id: Option<String>,
}

/// Starts the browser-based single-sign-on flow for a strategy such as
/// `oauth_tiktok` and waits for it to finish.
#[async_trait]
pub trait SsoFlow: Send + Sync {
    async fn start_sso_flow(&self, strategy: &str) -> Result<SsoOutcome, Error>;
}

/// The client-side view of the identity platform's session.
#[async_trait]
pub trait IdentitySession: Send + Sync {
    async fn set_active(&self, session_id: &str) -> Result<(), Error>;

    async fn is_signed_in(&self) -> bool;

    /// Mints a fresh bearer credential for the active session.
    async fn get_token(&self) -> Result<Option<String>, Error>;

    async fn current_user(&self) -> Result<Option<SessionUser>, Error>;

    async fn sign_out(&self) -> Result<(), Error>;
}

/// Resolves an inbound bearer credential to a user. `Ok(None)` means the
/// request is not authenticated.
#[async_trait]
pub trait RequestAuthenticator: Send + Sync {
    async fn authenticate_bearer(&self, bearer: Option<&str>) -> Result<Option<AuthContext>, Error>;
}

/// The managed backend's cache of third-party access tokens.
#[async_trait]
pub trait OAuthTokenSource: Send + Sync {
    async fn get_user_oauth_access_token(
        &self,
        user_id: &str,
        platform: &Platform,
    ) -> Result<Vec<OAuthAccessToken>, Error>;
}

/// One-shot user-visible alerts.
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}
