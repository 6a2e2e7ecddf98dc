//! Startup synchronisation from the hosting provider
//!
//! Builds the initial queue for each repository from its open pull
//! requests, the statuses we reported earlier and the reviewer comments
//! already posted.

use crate::config::RepoConfig;
use crate::error::Result;
use crate::platform::HostingService;
use crate::queue::{
    BuildStatus, CommandContext, PullRequestState, RepoQueue, TrackedRepo, parse_commands,
};
use crate::types::{CommitStatus, PullRequest};
use std::sync::Arc;
use tracing::{debug, info};

/// Initial status from a commit's statuses (newest first).
///
/// Only statuses carrying our context count; other reporters are
/// informational.
pub fn initial_status(statuses: &[CommitStatus], status_context: &str) -> BuildStatus {
    statuses
        .iter()
        .find(|s| s.context == status_context)
        .map_or(BuildStatus::Untested, |s| {
            BuildStatus::from_commit_state(s.commit_state())
        })
}

/// Load one pull request: status plus replayed reviewer commands
pub async fn load_pull(
    service: &dyn HostingService,
    config: &RepoConfig,
    pull: &PullRequest,
    status_context: &str,
) -> Result<PullRequestState> {
    let statuses = service.list_statuses(&pull.head_sha).await?;
    let mut state = PullRequestState::new(
        pull.number,
        pull.head_sha.clone(),
        initial_status(&statuses, status_context),
    );
    state.title.clone_from(&pull.title);

    if let Some(own) = statuses.iter().find(|s| s.context == status_context) {
        debug!(
            pr = pull.number,
            state = %own.state,
            description = own.description.as_deref().unwrap_or(""),
            "found earlier queue status"
        );
    }

    for comment in service.list_review_comments(pull.number).await? {
        if !config.is_reviewer(&comment.author)
            || comment.commit_id.as_deref() != Some(pull.head_sha.as_str())
        {
            continue;
        }
        if parse_commands(&comment.body, &comment.author, &mut state, CommandContext::Replay) {
            debug!(pr = pull.number, author = %comment.author, "replayed reviewer command");
        }
    }

    Ok(state)
}

/// Load the queue for one repository
pub async fn load_repo(
    service: &dyn HostingService,
    config: &RepoConfig,
    status_context: &str,
) -> Result<RepoQueue> {
    let mut queue = RepoQueue::new();

    for pull in service.list_open_pulls().await? {
        let state = load_pull(service, config, &pull, status_context).await?;
        debug!(repo = %service.repo(), pr = state.number, %state, "loaded pull request");
        queue.insert(state);
    }

    info!(
        repo = %service.repo(),
        pulls = queue.len(),
        testing = queue.testing_count(),
        "loaded repository"
    );
    Ok(queue)
}

/// Load every repository; any failure aborts startup
pub async fn bootstrap(
    repos: Vec<(RepoConfig, Arc<dyn HostingService>)>,
    status_context: &str,
) -> Result<Vec<TrackedRepo>> {
    let mut tracked = Vec::with_capacity(repos.len());
    for (config, service) in repos {
        let queue = load_repo(service.as_ref(), &config, status_context).await?;
        tracked.push(TrackedRepo::new(config, service, queue));
    }
    Ok(tracked)
}
