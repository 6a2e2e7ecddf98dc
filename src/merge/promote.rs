//! Promotion of tested candidates into the target branch

use crate::config::RepoConfig;
use crate::error::{Error, Result};
use crate::merge::plan::{failure_description, success_description};
use crate::platform::HostingService;
use crate::queue::{BuildResult, BuildStatus, PullRequestState};
use crate::types::CommitState;
use tracing::{info, warn};

/// Fast-forward the target branch to the tested candidate and mark the
/// head commit as successful.
///
/// The update is not forced: if the target branch moved while the build
/// ran, the candidate is no longer a fast-forward and promotion fails.
pub async fn promote_candidate(
    service: &dyn HostingService,
    config: &RepoConfig,
    state: &PullRequestState,
) -> Result<()> {
    let merge_commit = tested_commit(state)?;

    service
        .update_branch(&config.target_branch, merge_commit, false)
        .await?;
    info!(
        repo = %service.repo(),
        pr = state.number,
        merge_sha = %merge_commit,
        branch = %config.target_branch,
        "promoted candidate"
    );

    service
        .create_status(
            &state.head_commit,
            CommitState::Success,
            &success_description(merge_commit),
            None,
        )
        .await
}

/// Mark the head commit as failed, naming the failing builders
pub async fn report_failure(service: &dyn HostingService, state: &PullRequestState) -> Result<()> {
    let merge_commit = tested_commit(state)?;
    let failed: Vec<&str> = state
        .build_results
        .iter()
        .filter(|(_, result)| **result == BuildResult::Failure)
        .map(|(builder, _)| builder.as_str())
        .collect();

    warn!(
        repo = %service.repo(),
        pr = state.number,
        merge_sha = %merge_commit,
        failed = ?failed,
        "candidate failed"
    );

    service
        .create_status(
            &state.head_commit,
            CommitState::Failure,
            &failure_description(merge_commit, &failed),
            None,
        )
        .await
}

fn tested_commit(state: &PullRequestState) -> Result<&str> {
    match (state.status, state.merge_commit.as_deref()) {
        (BuildStatus::Success | BuildStatus::Failure, Some(sha)) => Ok(sha),
        _ => Err(Error::Internal(format!(
            "#{} has no finished trial merge: {state}",
            state.number
        ))),
    }
}
