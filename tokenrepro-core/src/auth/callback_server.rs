// tokenrepro-core/src/auth/callback_server.rs
//
// Loopback listener for the SSO redirect. Lives only for one sign-in.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Html,
    routing::get,
};
use axum_server::Handle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::Error;

pub const CALLBACK_PATH: &str = "/callback";

/// What the identity platform put on the redirect back to us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackResult {
    pub created_session_id: Option<String>,
    pub rotating_token_nonce: Option<String>,
    pub error: Option<String>,
}

/// Query string of the SSO redirect:
/// ?created_session_id=...&rotating_token_nonce=... or ?error=...
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    created_session_id: Option<String>,
    rotating_token_nonce: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
struct CallbackServerState {
    /// The first redirect is sent through `done_tx`; later ones are ignored.
    done_tx: Arc<Mutex<Option<oneshot::Sender<CallbackResult>>>>,
}

pub fn redirect_url(port: u16) -> String {
    format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH)
}

/// Starts a loopback server that waits for one SSO redirect. Returns the
/// receiver for the result and a sender that shuts the server down.
pub async fn start_callback_server(
    port: u16
) -> Result<(oneshot::Receiver<CallbackResult>, oneshot::Sender<()>), Error> {
    ensure_port_available(port).await?;

    let (done_tx, done_rx) = oneshot::channel::<CallbackResult>();
    let state = CallbackServerState {
        done_tx: Arc::new(Mutex::new(Some(done_tx))),
    };

    let app = Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let handle = Handle::new();
    let (shutdown_send, shutdown_recv) = oneshot::channel::<()>();

    let stopper = handle.clone();
    tokio::spawn(async move {
        // a dropped sender also stops the listener
        let _ = shutdown_recv.await;
        stopper.graceful_shutdown(None);
    });

    info!("SSO callback server listening on http://{}{}", addr, CALLBACK_PATH);
    tokio::spawn(async move {
        let served = axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await;
        match served {
            Ok(()) => info!("Callback server on port {} stopped", port),
            Err(e) => error!("Callback server on port {} failed: {}", port, e),
        }
    });

    Ok((done_rx, shutdown_send))
}

async fn handle_callback(
    State(state): State<CallbackServerState>,
    Query(query): Query<CallbackQuery>,
) -> (StatusCode, Html<String>) {
    let result = match query.error {
        Some(err) => {
            let desc = query.error_description.unwrap_or_default();
            CallbackResult {
                error: Some(if desc.is_empty() { err } else { format!("{}: {}", err, desc) }),
                ..Default::default()
            }
        }
        None => CallbackResult {
            created_session_id: query.created_session_id,
            rotating_token_nonce: query.rotating_token_nonce,
            error: None,
        },
    };

    let page = if let Some(err) = &result.error {
        format!("<h2>Sign-in failed</h2><p>{}</p>", err)
    } else {
        r#"
<h2>Signed in</h2>
<p>You can close this window and return to the terminal.</p>
<script>
  window.onload = function() {
      window.open('about:blank', '_self');
      window.close();
  };
</script>
"#
        .to_string()
    };

    if let Some(tx) = state.done_tx.lock().await.take() {
        let _ = tx.send(result);
    }
    (StatusCode::OK, Html(page))
}

/// Fails early when something else already holds the redirect port.
pub async fn ensure_port_available(port: u16) -> Result<(), Error> {
    TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], port)))
        .await
        .map(drop)
        .map_err(|e| Error::Auth(format!("Port {} not available: {}", port, e)))
}
