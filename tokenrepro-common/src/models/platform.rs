// File: tokenrepro-common/src/models/platform.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// Social providers the identity platform can link to a user.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    TikTok,
    Google,
    Discord,
    Twitch,
    GitHub,
}

impl Platform {
    /// SSO strategy identifier, e.g. `oauth_tiktok`.
    pub fn strategy(&self) -> String {
        format!("oauth_{}", self)
    }

    /// Human readable name for labels and alerts.
    pub fn label(&self) -> &'static str {
        match self {
            Platform::TikTok => "TikTok",
            Platform::Google => "Google",
            Platform::Discord => "Discord",
            Platform::Twitch => "Twitch",
            Platform::GitHub => "GitHub",
        }
    }

    /// Whether a provider tag names this platform. Accepts both `tiktok`
    /// and the `oauth_tiktok` form the backend API uses.
    pub fn matches_provider(&self, provider: &str) -> bool {
        let provider = provider.strip_prefix("oauth_").unwrap_or(provider);
        provider.eq_ignore_ascii_case(&self.to_string())
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::TikTok => write!(f, "tiktok"),
            Platform::Google => write!(f, "google"),
            Platform::Discord => write!(f, "discord"),
            Platform::Twitch => write!(f, "twitch"),
            Platform::GitHub => write!(f, "github"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        match s.strip_prefix("oauth_").unwrap_or(&s) {
            "tiktok" => Ok(Platform::TikTok),
            "google" => Ok(Platform::Google),
            "discord" => Ok(Platform::Discord),
            "twitch" => Ok(Platform::Twitch),
            "github" => Ok(Platform::GitHub),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}
