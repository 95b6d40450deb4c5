pub mod auth_traits;
pub mod storage_traits;

pub use auth_traits::{
    IdentitySession, Notifier, OAuthTokenSource, RequestAuthenticator, SsoFlow, SsoOutcome,
};
pub use storage_traits::{KeyValueStore, TokenCache};
