//! Backend token endpoint.
//!
//! One authenticated route, `GET /api/oauth-token`, that asks the identity
//! backend for the signed-in user's cached third-party access token and
//! relays it, or relays the error it got.

pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use axum_server::Handle;
use tower_http::trace::TraceLayer;
use tracing::info;

use tokenrepro_core::Error;
use tokenrepro_core::models::Platform;
use tokenrepro_core::token_check::OAUTH_TOKEN_PATH;
use tokenrepro_core::traits::{OAuthTokenSource, RequestAuthenticator};

/// Shared, read-only state for the route. Requests never mutate it.
#[derive(Clone)]
pub struct ServerState {
    pub authenticator: Arc<dyn RequestAuthenticator>,
    pub tokens: Arc<dyn OAuthTokenSource>,
    pub platform: Platform,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route(OAUTH_TOKEN_PATH, get(routes::get_oauth_token))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Serves the router until `handle` is told to shut down.
pub async fn serve(addr: SocketAddr, state: ServerState, handle: Handle) -> Result<(), Error> {
    info!("Token endpoint listening on http://{}{}", addr, OAUTH_TOKEN_PATH);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router(state).into_make_service())
        .await?;
    Ok(())
}
