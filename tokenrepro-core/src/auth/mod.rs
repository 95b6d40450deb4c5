pub mod callback_server;
pub mod token_cache;

pub use callback_server::{start_callback_server, CallbackResult};
pub use token_cache::{KeyringTokenCache, MemoryTokenCache};
