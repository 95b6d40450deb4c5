// tokenrepro-core/src/sign_in.rs

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::Error;
use crate::busy::BusyFlag;
use crate::models::Platform;
use crate::traits::{IdentitySession, Notifier, SsoFlow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    /// The flow created a session and it is now active.
    Activated(String),
    /// The flow finished without creating a session.
    NoSession,
    /// The flow failed; the user has been alerted.
    Failed,
    /// A sign-in is already in progress.
    Busy,
}

/// Drives one SSO attempt for the target platform and activates the
/// resulting session. No retries; the user presses the button again.
pub struct SignInOrchestrator {
    sso: Arc<dyn SsoFlow>,
    session: Arc<dyn IdentitySession>,
    notifier: Arc<dyn Notifier>,
    platform: Platform,
    connecting: BusyFlag,
}

impl SignInOrchestrator {
    pub fn new(
        sso: Arc<dyn SsoFlow>,
        session: Arc<dyn IdentitySession>,
        notifier: Arc<dyn Notifier>,
        platform: Platform,
    ) -> Self {
        Self {
            sso,
            session,
            notifier,
            platform,
            connecting: BusyFlag::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn is_connecting(&self) -> bool {
        self.connecting.is_busy()
    }

    pub async fn sign_in(&self) -> SignInOutcome {
        let Some(_connecting) = self.connecting.try_acquire() else {
            return SignInOutcome::Busy;
        };

        match self.run().await {
            Ok(Some(session_id)) => {
                info!("Session {} activated", session_id);
                SignInOutcome::Activated(session_id)
            }
            Ok(None) => {
                warn!("SSO flow for {} finished without a session", self.platform);
                SignInOutcome::NoSession
            }
            Err(e) => {
                error!("Sign-in with {} failed: {}", self.platform, e);
                self.notifier.alert("Error", &self.alert_message(&e));
                SignInOutcome::Failed
            }
        }
    }

    async fn run(&self) -> Result<Option<String>, Error> {
        let outcome = self.sso.start_sso_flow(&self.platform.strategy()).await?;
        match outcome.created_session_id {
            Some(session_id) => {
                self.session.set_active(&session_id).await?;
                Ok(Some(session_id))
            }
            None => Ok(None),
        }
    }

    fn alert_message(&self, err: &Error) -> String {
        let message = err.to_string();
        if message.trim().is_empty() {
            format!("Failed to sign in with {}", self.platform.label())
        } else {
            message
        }
    }
}
