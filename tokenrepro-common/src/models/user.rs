use serde::{Deserialize, Serialize};

use crate::models::platform::Platform;

/// A third-party account linked to the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalAccount {
    pub provider: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
}

impl ExternalAccount {
    /// Username, then email, then the literal "Connected".
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email_address.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Connected")
    }
}

/// Read-only snapshot of the identity platform's user, limited to what the
/// app needs: an id, an optional email and the linked accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub primary_email: Option<String>,
    #[serde(default)]
    pub external_accounts: Vec<ExternalAccount>,
}

impl SessionUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            primary_email: None,
            external_accounts: Vec::new(),
        }
    }

    pub fn external_account(&self, platform: &Platform) -> Option<&ExternalAccount> {
        self.external_accounts
            .iter()
            .find(|a| platform.matches_provider(&a.provider))
    }

    pub fn has_connected(&self, platform: &Platform) -> bool {
        self.external_account(platform).is_some()
    }

    pub fn email_or_na(&self) -> &str {
        self.primary_email
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or("N/A")
    }
}
