//! Trial-merge execution - effectful operations
//!
//! Takes a planned trial merge and performs it against the provider. The
//! local state is only touched once every remote step that starts the
//! build has succeeded.

use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::merge::plan::{pending_description, plan_trial_merge};
use crate::platform::HostingService;
use crate::queue::PullRequestState;
use crate::types::CommitState;
use tracing::{debug, info, warn};

/// Whether local state still matches the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Local head matches the provider's head
    Ready,
    /// The change moved since it was last synced
    Stale {
        /// Head commit the provider reports
        remote_head: String,
    },
}

/// Outcome of a trial-merge attempt that did not error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The CI branch now points at the candidate
    Started {
        /// Trial merge commit
        merge_commit: String,
    },
    /// Aborted before any ref was touched
    Stale {
        /// Head commit the provider reports
        remote_head: String,
    },
}

/// Compare the local head with the provider's current head
pub async fn check_freshness(
    service: &dyn HostingService,
    state: &PullRequestState,
) -> Result<Freshness> {
    let remote = service.get_pull(state.number).await?;
    if remote.head_sha == state.head_commit {
        Ok(Freshness::Ready)
    } else {
        Ok(Freshness::Stale {
            remote_head: remote.head_sha,
        })
    }
}

/// Point `branch` at `sha`, creating it if it does not exist yet
///
/// The end state is the same whether or not the branch existed. Errors
/// other than a missing ref are returned as they are.
pub async fn ensure_branch(service: &dyn HostingService, branch: &str, sha: &str) -> Result<()> {
    match service.update_branch(branch, sha, true).await {
        Ok(()) => Ok(()),
        Err(e) if e.is_missing_ref() => {
            debug!(branch, error = %e, "branch does not exist, creating it");
            service.create_branch(branch, sha).await
        }
        Err(e) => Err(e),
    }
}

/// Run the trial-merge protocol for `state` (EFFECTFUL)
///
/// On `Ok(Started)` the state is `Testing` with one `Unknown` result per
/// builder. On `Ok(Stale)` or `Err` the state is unchanged.
pub async fn attempt_trial_merge(
    service: &dyn HostingService,
    config: &RepoConfig,
    state: &mut PullRequestState,
) -> Result<AttemptOutcome> {
    let repo = service.repo().full_name();
    let plan = plan_trial_merge(config, state).ok_or_else(|| {
        Error::Internal(format!(
            "{repo}#{} is not eligible for a trial merge: {state}",
            state.number
        ))
    })?;

    if let Freshness::Stale { remote_head } = check_freshness(service, state).await? {
        warn!(
            repo = %repo,
            pr = plan.number,
            local_head = %plan.head_commit,
            remote_head = %remote_head,
            "head moved since last sync, aborting trial merge"
        );
        return Ok(AttemptOutcome::Stale { remote_head });
    }

    let base = service.get_branch_head(&plan.target_branch).await?;
    ensure_branch(service, &plan.scratch_branch, &base).await?;

    let merge_commit = service
        .merge(&plan.scratch_branch, &plan.head_commit, &plan.commit_message)
        .await?;

    service
        .update_branch(&plan.ci_branch, &merge_commit, true)
        .await?;

    state.start_testing(merge_commit.clone(), &plan.builders);
    info!(
        repo = %repo,
        pr = plan.number,
        head = %plan.head_commit,
        base = %base,
        merge_sha = %merge_commit,
        "starting build"
    );

    // The build is already running; a missing status is cosmetic.
    if let Err(e) = service
        .create_status(
            &plan.head_commit,
            CommitState::Pending,
            &pending_description(&merge_commit),
            None,
        )
        .await
    {
        warn!(repo = %repo, pr = plan.number, error = %e, "failed to report pending status");
    }

    Ok(AttemptOutcome::Started { merge_commit })
}
