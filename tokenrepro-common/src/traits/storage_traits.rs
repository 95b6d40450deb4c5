use async_trait::async_trait;

use crate::error::Error;

/// Device-local string key/value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>, Error>;

    /// Replaces the whole value in a single write.
    async fn set_item(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removing a missing key is not an error.
    async fn remove_item(&self, key: &str) -> Result<(), Error>;
}

/// Secure storage for the identity client's session credential.
pub trait TokenCache: Send + Sync {
    fn get_token(&self, key: &str) -> Result<Option<String>, Error>;
    fn save_token(&self, key: &str, token: &str) -> Result<(), Error>;
    fn clear_token(&self, key: &str) -> Result<(), Error>;
}
