// tokenrepro-tui/src/view.rs
//
// Pure render functions. Nothing here reads state on its own; callers pass
// in what to draw and print the returned string.

use std::collections::HashSet;

use colored::Colorize;

use tokenrepro_common::models::{LogEntry, Platform, SessionUser};

/// Which actions are offered and how they are labelled, derived from the
/// three flags the main screen depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionState {
    /// The connect action is only rendered while nothing is linked.
    pub show_connect: bool,
    pub connect_enabled: bool,
    pub connect_label: String,
    pub check_enabled: bool,
    pub check_label: &'static str,
}

impl ActionState {
    pub fn derive(platform: Platform, has_connected: bool, is_connecting: bool, is_checking: bool) -> Self {
        let connect_label = if is_connecting {
            "Connecting...".to_string()
        } else {
            format!("Connect Another {} Account", platform.label())
        };
        let check_label = if is_checking {
            "Checking..."
        } else {
            "Retrieve OAuth Token (Backend)"
        };
        Self {
            show_connect: !has_connected,
            connect_enabled: !is_connecting,
            connect_label,
            check_enabled: has_connected && !is_checking,
            check_label,
        }
    }
}

pub fn sign_in_label(platform: Platform, is_connecting: bool) -> String {
    if is_connecting {
        "Signing in...".to_string()
    } else {
        format!("Sign in with {}", platform.label())
    }
}

fn button(command: &str, label: &str, enabled: bool) -> String {
    let line = format!("  [{}] {}", command, label);
    if enabled {
        line
    } else {
        format!("{} {}", line.dimmed(), "(disabled)".dimmed())
    }
}

pub fn sign_in_screen(platform: Platform, is_connecting: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", format!("Clerk {} OAuth Bug Repro", platform.label()).bold()));
    out.push_str(&format!(
        "Sign in with {} to test the OAuth token retrieval bug\n\n",
        platform.label()
    ));
    out.push_str(&button("signin", &sign_in_label(platform, is_connecting), !is_connecting));
    out
}

pub fn status_card(user: Option<&SessionUser>, platform: Platform) -> String {
    let connected = user.is_some_and(|u| u.has_connected(&platform));
    let mut out = String::from("Current Status:\n");
    out.push_str(&format!("  User ID: {}\n", user.map(|u| u.id.as_str()).unwrap_or("")));
    out.push_str(&format!("  Email: {}\n", user.map(SessionUser::email_or_na).unwrap_or("N/A")));
    out.push_str(&format!(
        "  {} Connected: {}",
        platform.label(),
        if connected { "✅ Yes" } else { "❌ No" }
    ));
    if let Some(account) = user.and_then(|u| u.external_account(&platform)) {
        out.push_str(&format!("\n  External Account: {}", account.display_name()));
    }
    out
}

pub fn action_buttons(actions: &ActionState) -> String {
    let mut lines = Vec::new();
    if actions.show_connect {
        lines.push(button("connect", &actions.connect_label, actions.connect_enabled));
    }
    lines.push(button("check", actions.check_label, actions.check_enabled));
    lines.push(button("signout", &"Sign Out".red().to_string(), true));
    lines.join("\n")
}

/// One entry: local time and a badge, plus the pretty-printed payload when
/// expanded. `index` is the 1-based position used by `expand`/`collapse`.
pub fn log_entry(index: usize, entry: &LogEntry, expanded: bool) -> String {
    let badge = if entry.success {
        "✅ Success".green().to_string()
    } else {
        "❌ Failed".red().to_string()
    };
    let code = entry.code().map(|c| format!(" - {}", c)).unwrap_or_default();
    let marker = if expanded { "v" } else { ">" };
    let mut out = format!("{} {:>2}. {}  {}{}", marker, index, entry.local_time(), badge, code);
    if expanded {
        let json = serde_json::to_string_pretty(&entry.response).unwrap_or_else(|_| entry.response.to_string());
        for line in json.lines() {
            out.push_str("\n      ");
            out.push_str(line);
        }
    }
    out
}

pub fn log_list(entries: &[LogEntry], expanded: &HashSet<String>) -> String {
    let mut header = format!("Retrieval History ({})", entries.len());
    if !entries.is_empty() {
        header.push_str(&format!("  {}", "[clear] Clear".dimmed()));
    }
    if entries.is_empty() {
        return format!("{}\n  No retrieval attempts yet", header);
    }
    let mut out = header;
    for (i, entry) in entries.iter().enumerate() {
        out.push('\n');
        out.push_str(&log_entry(i + 1, entry, expanded.contains(&entry.id)));
    }
    out
}

pub struct MainScreen<'a> {
    pub platform: Platform,
    pub user: Option<&'a SessionUser>,
    pub is_connecting: bool,
    pub is_checking: bool,
    pub logs: &'a [LogEntry],
    pub expanded: &'a HashSet<String>,
}

pub fn main_screen(screen: &MainScreen<'_>) -> String {
    let has_connected = screen.user.is_some_and(|u| u.has_connected(&screen.platform));
    let actions = ActionState::derive(screen.platform, has_connected, screen.is_connecting, screen.is_checking);
    format!(
        "{}\n\n{}\n\n{}\n\n{}",
        format!("{} OAuth Token Bug Demo", screen.platform.label()).bold(),
        status_card(screen.user, screen.platform),
        action_buttons(&actions),
        log_list(screen.logs, screen.expanded),
    )
}
