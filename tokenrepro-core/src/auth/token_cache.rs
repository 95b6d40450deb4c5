use dashmap::DashMap;
use keyring::Entry;

use crate::Error;
use crate::traits::TokenCache;

pub const DEFAULT_KEYRING_SERVICE: &str = "tokenrepro";

/// Stores the identity client's credential in the OS keyring, one entry per key.
pub struct KeyringTokenCache {
    service: String,
}

impl KeyringTokenCache {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry, Error> {
        Ok(Entry::new(&self.service, key)?)
    }
}

impl Default for KeyringTokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_KEYRING_SERVICE)
    }
}

impl TokenCache for KeyringTokenCache {
    fn get_token(&self, key: &str) -> Result<Option<String>, Error> {
        match self.entry(key)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save_token(&self, key: &str, token: &str) -> Result<(), Error> {
        self.entry(key)?.set_password(token)?;
        Ok(())
    }

    fn clear_token(&self, key: &str) -> Result<(), Error> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token cache that forgets everything on exit.
#[derive(Default)]
pub struct MemoryTokenCache {
    tokens: DashMap<String, String>,
}

impl MemoryTokenCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenCache for MemoryTokenCache {
    fn get_token(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.tokens.get(key).map(|t| t.value().clone()))
    }

    fn save_token(&self, key: &str, token: &str) -> Result<(), Error> {
        self.tokens.insert(key.to_string(), token.to_string());
        Ok(())
    }

    fn clear_token(&self, key: &str) -> Result<(), Error> {
        self.tokens.remove(key);
        Ok(())
    }
}
