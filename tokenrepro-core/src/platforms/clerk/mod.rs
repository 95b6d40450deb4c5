//! Adapters for the hosted identity platform.
//!
//! [`ClerkFrontend`] plays the client role (SSO flow, session activation,
//! bearer minting) and [`ClerkBackend`] the server role (request
//! authentication, OAuth token lookup).

pub mod backend;
pub mod frontend;

pub use backend::ClerkBackend;
pub use frontend::{ClerkFrontend, CLIENT_JWT_KEY};
