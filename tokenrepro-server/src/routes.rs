// tokenrepro-server/src/routes.rs

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use tokenrepro_common::error::UNKNOWN_ERROR_CODE;
use tokenrepro_core::Error;
use tokenrepro_core::models::{iso_timestamp, OAuthAccessToken, TokenErrorBody, TokenSuccessBody};

use crate::ServerState;

pub type JsonResponse = (StatusCode, Json<Value>);

/// Bearer credential from the `Authorization` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

fn to_json<T: serde::Serialize>(body: &T) -> Json<Value> {
    Json(serde_json::to_value(body).unwrap_or(Value::Null))
}

pub fn unauthorized() -> JsonResponse {
    (
        StatusCode::UNAUTHORIZED,
        to_json(&TokenErrorBody {
            error: json!("Unauthorized"),
            code: None,
            timestamp: None,
        }),
    )
}

/// Maps a failed token lookup to a response. Upstream errors keep their
/// status and report their first code; anything else is a 500 unless the
/// error carries a status of its own.
pub fn error_response(err: &Error) -> JsonResponse {
    let timestamp = Some(iso_timestamp(Utc::now()));
    let code = Some(err.code().unwrap_or(UNKNOWN_ERROR_CODE).to_string());

    let (status, error) = match err {
        Error::Upstream { status, message, errors } => (
            *status,
            json!({
                "status": status,
                "message": message,
                "errors": errors,
            }),
        ),
        other => {
            let message = other.to_string();
            let message = if message.trim().is_empty() {
                "Failed to fetch OAuth token".to_string()
            } else {
                message
            };
            (other.status().unwrap_or(500), json!(message))
        }
    };

    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, to_json(&TokenErrorBody { error, code, timestamp }))
}

fn success_response(tokens: Vec<OAuthAccessToken>) -> JsonResponse {
    (
        StatusCode::OK,
        to_json(&TokenSuccessBody {
            success: true,
            tokens,
            timestamp: iso_timestamp(Utc::now()),
        }),
    )
}

/// `GET /api/oauth-token`
pub async fn get_oauth_token(
    State(state): State<ServerState>,
    headers: HeaderMap,
) -> JsonResponse {
    let auth = match state.authenticator.authenticate_bearer(bearer_token(&headers)).await {
        Ok(Some(auth)) => auth,
        Ok(None) => return unauthorized(),
        Err(e) => {
            warn!("Request authentication failed: {}", e);
            return unauthorized();
        }
    };

    info!("Fetching {} OAuth token for user: {}", state.platform.label(), auth.user_id);

    match state
        .tokens
        .get_user_oauth_access_token(&auth.user_id, &state.platform)
        .await
    {
        Ok(tokens) => {
            let has_token = tokens.first().is_some_and(|t| !t.token.is_empty());
            info!(token_count = tokens.len(), has_token, "Success");
            success_response(tokens)
        }
        Err(e) => {
            error!(status = ?e.status(), code = ?e.code(), "OAuth token error: {}", e);
            error_response(&e)
        }
    }
}
