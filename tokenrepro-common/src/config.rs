// File: tokenrepro-common/src/config.rs
//
// Process-wide settings, read once at startup and passed down explicitly.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

use crate::error::Error;
use crate::models::Platform;

pub const PUBLISHABLE_KEY_VARS: [&str; 2] = [
    "CLERK_PUBLISHABLE_KEY",
    "EXPO_PUBLIC_CLERK_PUBLISHABLE_KEY",
];
pub const SECRET_KEY_VAR: &str = "CLERK_SECRET_KEY";
pub const BACKEND_API_URL_VAR: &str = "CLERK_API_URL";
pub const API_URL_VAR: &str = "TOKENREPRO_API_URL";
pub const DATA_DIR_VAR: &str = "TOKENREPRO_DATA_DIR";
pub const CALLBACK_PORT_VAR: &str = "TOKENREPRO_CALLBACK_PORT";
pub const PLATFORM_VAR: &str = "TOKENREPRO_PLATFORM";

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8081";
pub const DEFAULT_BACKEND_API_URL: &str = "https://api.clerk.com";
pub const DEFAULT_CALLBACK_PORT: u16 = 9876;

/// A decoded publishable key: `pk_test_` or `pk_live_` followed by the
/// base64 of the frontend API host with a trailing `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishableKey {
    raw: String,
    frontend_api: String,
    live: bool,
}

impl PublishableKey {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let raw = raw.trim();
        let (live, encoded) = if let Some(rest) = raw.strip_prefix("pk_live_") {
            (true, rest)
        } else if let Some(rest) = raw.strip_prefix("pk_test_") {
            (false, rest)
        } else {
            return Err(Error::Config("publishable key must start with pk_test_ or pk_live_".into()));
        };

        let decoded = STANDARD
            .decode(encoded)
            .or_else(|_| STANDARD_NO_PAD.decode(encoded))
            .map_err(|e| Error::Config(format!("publishable key is not valid base64: {}", e)))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| Error::Config("publishable key does not decode to text".into()))?;

        let host = decoded
            .strip_suffix('$')
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::Config("publishable key does not encode a frontend API host".into()))?;

        Ok(Self {
            raw: raw.to_string(),
            frontend_api: host.to_string(),
            live,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn frontend_api_host(&self) -> &str {
        &self.frontend_api
    }

    pub fn frontend_api_url(&self) -> String {
        format!("https://{}", self.frontend_api)
    }

    pub fn is_live(&self) -> bool {
        self.live
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub publishable_key: PublishableKey,
    /// Only the backend needs this.
    pub secret_key: Option<String>,
    /// Base URL of our own backend, used by the token check client.
    pub api_url: String,
    /// Base URL of the identity platform's backend API.
    pub backend_api_url: String,
    pub data_dir: PathBuf,
    pub callback_port: u16,
    pub target_platform: Platform,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, Error> {
        let _ = dotenv::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Fails when no publishable key
    /// is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let raw_key = PUBLISHABLE_KEY_VARS
            .iter()
            .find_map(|k| get(*k))
            .ok_or_else(|| {
                Error::Config(format!(
                    "Add {} to your .env file",
                    PUBLISHABLE_KEY_VARS[0]
                ))
            })?;
        let publishable_key = PublishableKey::parse(&raw_key)?;

        let callback_port = match get(CALLBACK_PORT_VAR) {
            Some(p) => p
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("{} is not a port: {}", CALLBACK_PORT_VAR, e)))?,
            None => DEFAULT_CALLBACK_PORT,
        };

        let target_platform = match get(PLATFORM_VAR) {
            Some(p) => p.parse::<Platform>().map_err(Error::Config)?,
            None => Platform::default(),
        };

        let data_dir = get(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        Ok(Self {
            publishable_key,
            secret_key: get(SECRET_KEY_VAR),
            api_url: get(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            backend_api_url: get(BACKEND_API_URL_VAR)
                .unwrap_or_else(|| DEFAULT_BACKEND_API_URL.to_string()),
            data_dir,
            callback_port,
            target_platform,
        })
    }

    pub fn require_secret_key(&self) -> Result<&str, Error> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| Error::Config(format!("Add {} to your .env file", SECRET_KEY_VAR)))
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("tokenrepro")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    // "clerk.example.com$"
    const TEST_KEY: &str = "pk_test_Y2xlcmsuZXhhbXBsZS5jb20k";

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn decodes_frontend_api() {
        let key = PublishableKey::parse(TEST_KEY).unwrap();
        assert_eq!(key.frontend_api_host(), "clerk.example.com");
        assert_eq!(key.frontend_api_url(), "https://clerk.example.com");
        assert!(!key.is_live());
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(PublishableKey::parse("sk_test_abc").is_err());
        assert!(PublishableKey::parse("pk_test_!!!").is_err());
        // "clerk.example.com" without the trailing '$'
        assert!(PublishableKey::parse("pk_test_Y2xlcmsuZXhhbXBsZS5jb20=").is_err());
    }

    #[test]
    fn missing_publishable_key_fails_fast() {
        let err = AppConfig::from_lookup(lookup(&[(SECRET_KEY_VAR, "sk_test_x")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn expo_variable_is_accepted_and_defaults_apply() {
        let config = AppConfig::from_lookup(lookup(&[
            ("EXPO_PUBLIC_CLERK_PUBLISHABLE_KEY", TEST_KEY),
        ]))
        .unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.backend_api_url, DEFAULT_BACKEND_API_URL);
        assert_eq!(config.callback_port, DEFAULT_CALLBACK_PORT);
        assert_eq!(config.target_platform, Platform::TikTok);
        assert!(config.require_secret_key().is_err());
    }

    #[test]
    fn overrides_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CLERK_PUBLISHABLE_KEY", TEST_KEY),
            (SECRET_KEY_VAR, "sk_test_secret"),
            (API_URL_VAR, "http://localhost:3000"),
            (CALLBACK_PORT_VAR, "7000"),
            (PLATFORM_VAR, "discord"),
            (DATA_DIR_VAR, "/tmp/tokenrepro-test"),
        ]))
        .unwrap();
        assert_eq!(config.require_secret_key().unwrap(), "sk_test_secret");
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.callback_port, 7000);
        assert_eq!(config.target_platform, Platform::Discord);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tokenrepro-test"));
    }
}
