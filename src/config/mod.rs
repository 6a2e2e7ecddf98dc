//! Configuration for tracked repositories
//!
//! Loaded once from TOML at startup. Any inconsistency is fatal before
//! queue processing begins.

mod load;

pub use load::{default_config_path, load_config, parse_config};

use crate::types::RepoId;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::time::Duration;

/// Default status context reported on pull request heads
pub const DEFAULT_STATUS_CONTEXT: &str = "merge-queue";

/// Top-level configuration file
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Process-wide settings
    #[serde(default)]
    pub main: MainConfig,
    /// Tracked repositories
    #[serde(rename = "repo", default)]
    pub repos: Vec<RepoConfig>,
}

/// Process-wide settings
#[derive(Debug, Clone, Deserialize)]
pub struct MainConfig {
    /// API token; falls back to `GITHUB_TOKEN`
    pub token: Option<String>,
    /// API base URL (GitHub Enterprise); defaults to api.github.com
    pub api_url: Option<String>,
    /// Context name used for commit statuses
    #[serde(default = "default_status_context")]
    pub status_context: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Attempts per remote call (transient failures only)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Seconds between periodic drive passes
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for MainConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: None,
            status_context: default_status_context(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            tick_secs: default_tick_secs(),
        }
    }
}

impl MainConfig {
    /// Per-request timeout
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Interval between periodic drive passes
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

fn default_status_context() -> String {
    DEFAULT_STATUS_CONTEXT.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_tick_secs() -> u64 {
    60
}

/// Static settings for one tracked repository
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct RepoConfig {
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Branch that tested changes are promoted into
    #[serde(alias = "master_branch")]
    pub target_branch: String,
    /// Branch used to stage the trial merge
    #[serde(alias = "tmp_branch")]
    pub scratch_branch: String,
    /// Branch watched by CI; updating it starts a build
    #[serde(alias = "buildbot_branch")]
    pub ci_branch: String,
    /// Logins whose commands are honored
    pub reviewers: BTreeSet<String>,
    /// Builders expected to report for every trial merge
    pub builders: BTreeSet<String>,
}

impl RepoConfig {
    /// Repository identity
    pub fn repo_id(&self) -> RepoId {
        RepoId::new(&self.owner, &self.name)
    }

    /// Whether `login` may issue commands
    pub fn is_reviewer(&self, login: &str) -> bool {
        self.reviewers.contains(login)
    }
}
