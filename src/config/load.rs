//! Loading and validation of the TOML configuration file.

use super::Config;
use crate::error::{Error, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Filename looked up in the working directory and the config directory.
const CONFIG_FILE: &str = "cfg.toml";

/// Application directory name under the user config directory.
const APP_DIR: &str = "mergeq";

/// Resolve the default configuration path.
///
/// Prefers `./cfg.toml`; otherwise `<config dir>/mergeq/cfg.toml`.
pub fn default_config_path() -> PathBuf {
    let local = PathBuf::from(CONFIG_FILE);
    if local.exists() {
        return local;
    }
    dirs::config_dir().map_or(local, |dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Load and validate configuration from disk.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

    parse_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), strip_prefix(&e))))
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse: {e}")))?;
    validate(&config)?;
    Ok(config)
}

fn strip_prefix(err: &Error) -> String {
    match err {
        Error::Config(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.repos.is_empty() {
        return Err(Error::Config("no [[repo]] entries configured".to_string()));
    }

    if let Some(api_url) = &config.main.api_url {
        url::Url::parse(api_url)
            .map_err(|e| Error::Config(format!("invalid api_url {api_url:?}: {e}")))?;
    }

    if config.main.max_attempts == 0 {
        return Err(Error::Config("max_attempts must be at least 1".to_string()));
    }

    let mut seen = HashSet::new();
    for repo in &config.repos {
        let label = if repo.owner.is_empty() || repo.name.is_empty() {
            "<unnamed repository>".to_string()
        } else {
            repo.repo_id().full_name()
        };

        for (field, value) in [
            ("owner", &repo.owner),
            ("name", &repo.name),
            ("target_branch", &repo.target_branch),
            ("scratch_branch", &repo.scratch_branch),
            ("ci_branch", &repo.ci_branch),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{label}: {field} must not be empty")));
            }
        }

        if repo.target_branch == repo.scratch_branch
            || repo.target_branch == repo.ci_branch
            || repo.scratch_branch == repo.ci_branch
        {
            return Err(Error::Config(format!(
                "{label}: target_branch, scratch_branch and ci_branch must all differ"
            )));
        }

        if repo.reviewers.is_empty() {
            return Err(Error::Config(format!("{label}: no reviewers configured")));
        }

        if repo.builders.is_empty() {
            return Err(Error::Config(format!("{label}: no builders configured")));
        }

        if !seen.insert(repo.repo_id()) {
            return Err(Error::Config(format!("{label}: configured more than once")));
        }
    }

    Ok(())
}
