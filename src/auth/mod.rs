//! Authentication for the hosting API
//!
//! The token comes from the configuration file or, failing that, from the
//! `GITHUB_TOKEN` environment variable.

use crate::config::MainConfig;
use crate::error::{Error, Result};

/// Environment variable consulted when the config has no token
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from the configuration file
    Config,
    /// Token from environment variable
    EnvVar,
}

/// Resolve the API token.
///
/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
/// in production.
pub fn resolve_token<F>(main: &MainConfig, env: F) -> Result<(String, AuthSource)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(token) = main.token.as_deref().filter(|t| !t.trim().is_empty()) {
        return Ok((token.to_string(), AuthSource::Config));
    }

    env(TOKEN_ENV_VAR)
        .filter(|t| !t.trim().is_empty())
        .map(|t| (t, AuthSource::EnvVar))
        .ok_or_else(|| {
            Error::Config(format!(
                "no API token: set [main] token or the {TOKEN_ENV_VAR} environment variable"
            ))
        })
}
