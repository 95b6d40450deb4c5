// tokenrepro-tui/src/app.rs

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, warn};

use tokenrepro_common::models::{Platform, SessionUser};
use tokenrepro_common::traits::{IdentitySession, Notifier};
use tokenrepro_core::{CheckOutcome, LogStore, SignInOrchestrator, SignInOutcome, TokenCheckClient};

use crate::view::{self, ActionState, MainScreen};

pub const HELP_TEXT: &str = "\
Commands:
  signin        - sign in through the platform's SSO flow
  connect       - link another account (only while none is linked)
  check         - call the backend token endpoint and record the result
  logs          - show the retrieval history
  expand <n>    - show the raw payload of entry n
  collapse <n>  - hide the payload of entry n
  clear         - delete the retrieval history
  signout       - end the session
  status        - redraw the current screen
  help          - show this help
  quit          - exit";

/// Terminal front end. Owns the UI-only state (the cached user and which
/// log entries are expanded); everything else lives in the core services.
pub struct App {
    session: Arc<dyn IdentitySession>,
    sign_in: SignInOrchestrator,
    checker: TokenCheckClient,
    logs: Arc<LogStore>,
    notifier: Arc<dyn Notifier>,
    user: Option<SessionUser>,
    expanded: HashSet<String>,
}

impl App {
    pub fn new(
        session: Arc<dyn IdentitySession>,
        sign_in: SignInOrchestrator,
        checker: TokenCheckClient,
        logs: Arc<LogStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            sign_in,
            checker,
            logs,
            notifier,
            user: None,
            expanded: HashSet::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.sign_in.platform()
    }

    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    fn has_connected(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.has_connected(&self.platform()))
    }

    fn actions(&self) -> ActionState {
        ActionState::derive(
            self.platform(),
            self.has_connected(),
            self.sign_in.is_connecting(),
            self.checker.is_checking(),
        )
    }

    /// Re-reads the user from the session. Leaves the cached user empty when
    /// signed out or when the lookup fails.
    pub async fn refresh_user(&mut self) {
        self.user = if self.session.is_signed_in().await {
            match self.session.current_user().await {
                Ok(user) => user,
                Err(e) => {
                    warn!("Could not load the current user: {}", e);
                    None
                }
            }
        } else {
            None
        };
    }

    pub async fn render(&self) -> String {
        if !self.session.is_signed_in().await {
            return view::sign_in_screen(self.platform(), self.sign_in.is_connecting());
        }
        let logs = self.logs.entries().await;
        view::main_screen(&MainScreen {
            platform: self.platform(),
            user: self.user.as_ref(),
            is_connecting: self.sign_in.is_connecting(),
            is_checking: self.checker.is_checking(),
            logs: &logs,
            expanded: &self.expanded,
        })
    }

    /// Runs one command line. Returns whether to quit and what to print.
    pub async fn dispatch(&mut self, line: &str) -> (bool, Option<String>) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return (false, None);
        }
        let cmd = parts[0].to_lowercase();
        let args = &parts[1..];

        match cmd.as_str() {
            "help" => (false, Some(HELP_TEXT.to_string())),
            "signin" => (false, Some(self.handle_sign_in(false).await)),
            "connect" => (false, Some(self.handle_sign_in(true).await)),
            "check" => (false, Some(self.handle_check().await)),
            "logs" => (false, Some(self.render_logs().await)),
            "expand" | "collapse" => (false, Some(self.handle_toggle(cmd == "expand", args).await)),
            "clear" => (false, Some(self.handle_clear().await)),
            "signout" => (false, Some(self.handle_sign_out().await)),
            "status" => {
                self.refresh_user().await;
                (false, Some(self.render().await))
            }
            "quit" | "exit" => (true, Some("Goodbye!".to_string())),
            _ => (
                false,
                Some(format!("Unknown command '{}'. Type 'help' for usage.", cmd)),
            ),
        }
    }

    async fn handle_sign_in(&mut self, connect: bool) -> String {
        let signed_in = self.session.is_signed_in().await;
        if connect {
            if !signed_in {
                return "Not signed in. Use 'signin' first.".to_string();
            }
            let actions = self.actions();
            if !actions.show_connect {
                return format!("A {} account is already connected.", self.platform().label());
            }
            if !actions.connect_enabled {
                return "A sign-in is already in progress.".to_string();
            }
        } else if signed_in {
            return "Already signed in. Use 'connect' to link another account.".to_string();
        }

        let outcome = self.sign_in.sign_in().await;
        self.refresh_user().await;
        match outcome {
            SignInOutcome::Activated(_) => self.render().await,
            SignInOutcome::NoSession => "Sign-in finished without a session.".to_string(),
            SignInOutcome::Failed => "Sign-in failed.".to_string(),
            SignInOutcome::Busy => "A sign-in is already in progress.".to_string(),
        }
    }

    async fn handle_check(&mut self) -> String {
        if !self.session.is_signed_in().await {
            return "Not signed in. Use 'signin' first.".to_string();
        }
        let actions = self.actions();
        if !actions.check_enabled {
            return format!(
                "'{}' is disabled until a {} account is connected.",
                actions.check_label,
                self.platform().label()
            );
        }

        let user_id = self.user.as_ref().map(|u| u.id.clone());
        match self.checker.check_token(user_id.as_deref()).await {
            CheckOutcome::Recorded(entry) => view::log_entry(1, &entry, self.is_expanded(&entry.id)),
            CheckOutcome::Skipped => "No signed-in user; nothing was sent.".to_string(),
            CheckOutcome::Busy => "A token check is already running.".to_string(),
        }
    }

    async fn render_logs(&self) -> String {
        let logs = self.logs.entries().await;
        view::log_list(&logs, &self.expanded)
    }

    async fn handle_toggle(&mut self, expand: bool, args: &[&str]) -> String {
        let usage = if expand { "Usage: expand <n>" } else { "Usage: collapse <n>" };
        let Some(index) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
            return usage.to_string();
        };
        let logs = self.logs.entries().await;
        let Some(entry) = index.checked_sub(1).and_then(|i| logs.get(i)) else {
            return format!("No log entry #{}. There are {} entries.", index, logs.len());
        };
        if expand {
            self.expanded.insert(entry.id.clone());
        } else {
            self.expanded.remove(&entry.id);
        }
        view::log_entry(index, entry, expand)
    }

    async fn handle_clear(&mut self) -> String {
        match self.logs.clear().await {
            Ok(()) => {
                self.expanded.clear();
                self.notifier.alert("Success", "Logs cleared");
                self.render_logs().await
            }
            Err(e) => {
                error!("Failed to clear logs: {}", e);
                self.notifier.alert("Error", "Failed to clear logs");
                self.render_logs().await
            }
        }
    }

    async fn handle_sign_out(&mut self) -> String {
        if let Err(e) = self.session.sign_out().await {
            error!("Sign-out failed: {}", e);
        }
        self.user = None;
        self.render().await
    }
}
