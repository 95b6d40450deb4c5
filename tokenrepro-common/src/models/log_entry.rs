use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

static LAST_LOG_ID: AtomicI64 = AtomicI64::new(0);

/// ISO-8601 UTC timestamp with millisecond precision.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Millisecond timestamp as a string, bumped past the last id handed out so
/// two captures in the same millisecond still get distinct ids.
fn next_log_id(now_ms: i64) -> String {
    let mut last = LAST_LOG_ID.load(Ordering::SeqCst);
    loop {
        let candidate = if now_ms > last { now_ms } else { last + 1 };
        match LAST_LOG_ID.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return candidate.to_string(),
            Err(actual) => last = actual,
        }
    }
}

/// One token retrieval attempt. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: String,
    pub success: bool,
    pub response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl LogEntry {
    pub fn capture(success: bool, response: Value, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: next_log_id(now.timestamp_millis()),
            timestamp: iso_timestamp(now),
            success,
            response,
            user_id,
        }
    }

    /// Entry for a parsed backend body; `success` is the body's own flag.
    /// Only a JSON `true` counts: truthy non-booleans such as `"yes"` or `1`
    /// are recorded as failures.
    pub fn from_response(body: Value, user_id: Option<String>) -> Self {
        let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        Self::capture(success, body, user_id)
    }

    /// Entry for a call that never produced a parseable body.
    pub fn network_error(details: impl Into<String>, user_id: Option<String>) -> Self {
        let response = json!({
            "error": "Network error",
            "details": details.into(),
        });
        Self::capture(false, response, user_id)
    }

    /// The `code` field of the payload, when it is a string.
    pub fn code(&self) -> Option<&str> {
        self.response.get("code").and_then(Value::as_str)
    }

    /// Timestamp rendered in the local timezone, or the raw string if it
    /// does not parse.
    pub fn local_time(&self) -> String {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| self.timestamp.clone())
    }
}
