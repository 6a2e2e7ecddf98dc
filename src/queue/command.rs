//! Reviewer command parsing
//!
//! A comment body is split on whitespace and every token is matched on its
//! own. Unrecognized tokens are ignored. Authorization is the caller's job.

use crate::queue::state::PullRequestState;
use regex::Regex;
use std::sync::LazyLock;

static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+").expect("valid regex"));

/// Where a comment came from
///
/// `retry` is only honored for live comments, so replaying history at
/// startup cannot re-queue an old failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandContext {
    /// Historical comment read during startup
    Replay,
    /// Comment delivered as it was posted
    Live,
}

/// A recognized command token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `r+` / `r=me`: approve as the commenter
    Approve,
    /// `r=<name>`: approve on behalf of `<name>`
    ApproveAs(String),
    /// `r-`: revoke approval
    Unapprove,
    /// `p=<n>`; `None` when the payload is not an integer
    Priority(Option<i64>),
    /// `retry`
    Retry,
}

impl Command {
    /// Recognize a single token
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "r+" | "r=me" => Some(Self::Approve),
            "r-" => Some(Self::Unapprove),
            "retry" => Some(Self::Retry),
            _ => {
                if let Some(name) = token.strip_prefix("r=") {
                    Some(Self::ApproveAs(name.to_string()))
                } else {
                    token
                        .strip_prefix("p=")
                        .map(|value| Self::Priority(value.parse().ok()))
                }
            }
        }
    }
}

/// Apply every command in `body` to `state`.
///
/// Returns true if at least one token was recognized (and accepted in this
/// context), which tells the caller to drive the queue now.
pub fn parse_commands(
    body: &str,
    commenter: &str,
    state: &mut PullRequestState,
    context: CommandContext,
) -> bool {
    let mut changed = false;

    for token in TOKEN.find_iter(body).map(|m| m.as_str()) {
        let found = match Command::parse(token) {
            Some(Command::Approve) => {
                state.approved_by = commenter.to_string();
                true
            }
            Some(Command::ApproveAs(name)) => {
                state.approved_by = name;
                true
            }
            Some(Command::Unapprove) => {
                state.approved_by.clear();
                true
            }
            Some(Command::Priority(value)) => {
                if let Some(priority) = value {
                    state.priority = priority;
                }
                true
            }
            Some(Command::Retry) if context == CommandContext::Live => {
                state.reset_build();
                true
            }
            Some(Command::Retry) | None => false,
        };

        changed |= found;
    }

    changed
}
