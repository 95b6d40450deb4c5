use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A third-party access token cached by the identity backend. Fields the
/// app does not read are kept in `extra` so they are relayed unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthAccessToken {
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_account_id: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 200 body of `GET /api/oauth-token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSuccessBody {
    pub success: bool,
    pub tokens: Vec<OAuthAccessToken>,
    pub timestamp: String,
}

/// Error body of `GET /api/oauth-token`. `code` and `timestamp` are absent
/// on the 401 path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenErrorBody {
    pub error: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Identity of an authenticated inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub session_id: Option<String>,
}
