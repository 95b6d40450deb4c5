// src/lib.rs

pub mod auth;
pub mod busy;
pub mod http;
pub mod logs;
pub mod platforms;
pub mod sign_in;
pub mod storage;
pub mod token_check;

pub use tokenrepro_common::error::Error;
pub use tokenrepro_common::{config, models, traits};
pub use http::{DefaultHttpClient, HttpClient};
pub use logs::LogStore;
pub use sign_in::{SignInOrchestrator, SignInOutcome};
pub use token_check::{CheckOutcome, TokenCheckClient};
