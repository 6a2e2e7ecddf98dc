//! Shared setup for CLI commands
//!
//! Loads configuration, resolves the API token and builds one provider
//! service per tracked repository.

use mergeq::auth::{AuthSource, resolve_token};
use mergeq::config::{Config, RepoConfig, load_config};
use mergeq::error::Result;
use mergeq::platform::{GitHubService, HostingService, RetryPolicy};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Shared context for commands that talk to the provider
pub struct ServiceContext {
    /// Validated configuration
    pub config: Config,
    /// One service per configured repository, in config order
    pub services: Vec<(RepoConfig, Arc<dyn HostingService>)>,
}

impl ServiceContext {
    /// Load config from `path` and create the provider services
    pub fn new(path: &Path) -> Result<Self> {
        let config = load_config(path)?;
        let (token, source) = resolve_token(&config.main, |key| std::env::var(key).ok())?;
        debug!(
            source = match source {
                AuthSource::Config => "config",
                AuthSource::EnvVar => "env",
            },
            "resolved API token"
        );

        let retry = RetryPolicy::new(config.main.max_attempts, config.main.request_timeout());
        let mut services = Vec::with_capacity(config.repos.len());
        for repo in &config.repos {
            let service = GitHubService::new(
                &token,
                repo.repo_id(),
                config.main.api_url.as_deref(),
                &config.main.status_context,
                retry,
            )?;
            services.push((repo.clone(), Arc::new(service) as Arc<dyn HostingService>));
        }

        Ok(Self { config, services })
    }
}
