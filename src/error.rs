//! Error types for mergeq

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the merge queue
#[derive(Debug, Error)]
pub enum Error {
    /// GitHub API failure without a usable status code
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// HTTP response with a non-success status
    #[error("GitHub API returned {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response message
        message: String,
    },

    /// The requested remote resource does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The provider refused to merge because of conflicts
    #[error("merge conflict merging {head} into {base}")]
    MergeConflict {
        /// Branch merged into
        base: String,
        /// Commit being merged
        head: String,
    },

    /// A remote call exceeded its deadline
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Connection-level failure (DNS, TLS, reset)
    #[error("transport error: {0}")]
    Transport(String),

    /// Generic platform failure (also used by test doubles)
    #[error("platform error: {0}")]
    Platform(String),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Repository is not tracked by this process
    #[error("repository not tracked: {0}")]
    UnknownRepository(String),

    /// Pull request is not tracked for the repository
    #[error("pull request #{number} not tracked in {repo}")]
    UnknownPullRequest {
        /// Repository full name
        repo: String,
        /// Pull request number
        number: u64,
    },

    /// The coordinator task has shut down
    #[error("coordinator stopped")]
    CoordinatorStopped,

    /// Internal invariant failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether retrying the same call may succeed.
    ///
    /// Server errors, rate limiting, timeouts and transport failures are
    /// transient. Everything else is permanent.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout(_) | Self::Transport(_) => true,
            _ => false,
        }
    }

    /// Whether a ref update failed because the ref does not exist.
    ///
    /// GitHub answers 422 for updates of a missing ref; some proxies and
    /// older Enterprise versions answer 404.
    pub const fn is_missing_ref(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Http { status: 422, .. })
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                let status = source.status_code.as_u16();
                if status == 404 {
                    Self::NotFound(source.message)
                } else {
                    Self::Http {
                        status,
                        message: source.message,
                    }
                }
            }
            other => Self::GitHubApi(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::Transport(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::GitHubApi(err.to_string())
        }
    }
}

/// Result type alias for mergeq operations
pub type Result<T> = std::result::Result<T, Error>;
