pub mod log_entry;
pub mod platform;
pub mod token;
pub mod user;

pub use log_entry::{iso_timestamp, LogEntry};
pub use platform::Platform;
pub use token::{AuthContext, OAuthAccessToken, TokenErrorBody, TokenSuccessBody};
pub use user::{ExternalAccount, SessionUser};
