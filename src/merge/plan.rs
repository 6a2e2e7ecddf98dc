//! Trial-merge planning - pure functions
//!
//! Everything the trial merge needs that can be decided without I/O: branch
//! names, the merge commit message and status texts.

use crate::config::RepoConfig;
use crate::queue::PullRequestState;
use crate::types::short_sha;

/// Everything needed to run one trial merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialMergePlan {
    /// PR number
    pub number: u64,
    /// Head commit to merge
    pub head_commit: String,
    /// Branch the candidate is based on
    pub target_branch: String,
    /// Branch the merge commit is created on
    pub scratch_branch: String,
    /// Branch that triggers CI
    pub ci_branch: String,
    /// Merge commit message
    pub commit_message: String,
    /// Builders expected to report
    pub builders: Vec<String>,
}

/// Create a trial-merge plan, or `None` if the change is not eligible
#[must_use]
pub fn plan_trial_merge(config: &RepoConfig, state: &PullRequestState) -> Option<TrialMergePlan> {
    if !state.is_eligible() {
        return None;
    }

    Some(TrialMergePlan {
        number: state.number,
        head_commit: state.head_commit.clone(),
        target_branch: config.target_branch.clone(),
        scratch_branch: config.scratch_branch.clone(),
        ci_branch: config.ci_branch.clone(),
        commit_message: merge_message(&state.head_commit, &config.scratch_branch, &state.approved_by),
        builders: config.builders.iter().cloned().collect(),
    })
}

/// Merge commit message: `Merge <sha7> into <branch>` plus an
/// `Approved-by:` trailer
#[must_use]
pub fn merge_message(head_commit: &str, scratch_branch: &str, approved_by: &str) -> String {
    format!(
        "Merge {} into {scratch_branch}\n\nApproved-by: {approved_by}",
        short_sha(head_commit)
    )
}

/// Status description while a candidate is being tested
#[must_use]
pub fn pending_description(merge_commit: &str) -> String {
    format!("Testing candidate {merge_commit}...")
}

/// Status description after every builder passed
#[must_use]
pub fn success_description(merge_commit: &str) -> String {
    format!("Test successful: {merge_commit}")
}

/// Status description after a builder failed
#[must_use]
pub fn failure_description(merge_commit: &str, failed: &[&str]) -> String {
    format!("Test failed on {}: {merge_commit}", failed.join(", "))
}
