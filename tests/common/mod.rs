//! Shared fixtures for integration and unit tests

#![allow(dead_code)]

mod mock_platform;

pub use mock_platform::{Call, MockHostingService};

use mergeq::config::RepoConfig;
use mergeq::platform::HostingService;
use mergeq::queue::{BuildStatus, PullRequestState, RepoQueue, TrackedRepo};
use std::sync::Arc;

/// Status context used by the mock and the fixtures
pub const STATUS_CONTEXT: &str = "merge-queue";

/// Config for `acme/widgets` with two builders and reviewer alice
pub fn repo_config() -> RepoConfig {
    RepoConfig {
        owner: "acme".to_string(),
        name: "widgets".to_string(),
        target_branch: "master".to_string(),
        scratch_branch: "tmp".to_string(),
        ci_branch: "buildbot".to_string(),
        reviewers: ["alice".to_string(), "bob".to_string()].into(),
        builders: ["linux".to_string(), "mac".to_string()].into(),
    }
}

/// Untested state with the given approval and priority
pub fn make_state(number: u64, approved_by: &str, priority: i64) -> PullRequestState {
    let mut state = PullRequestState::new(number, format!("head_{number}"), BuildStatus::Untested);
    state.approved_by = approved_by.to_string();
    state.priority = priority;
    state
}

/// Tracked repo over `mock` holding `states`; each state's PR is also
/// registered on the mock with the same head
pub fn tracked_repo(mock: &Arc<MockHostingService>, states: Vec<PullRequestState>) -> TrackedRepo {
    let mut queue = RepoQueue::new();
    for state in states {
        mock.add_pull(state.number, &state.head_commit);
        queue.insert(state);
    }
    TrackedRepo::new(
        repo_config(),
        Arc::clone(mock) as Arc<dyn HostingService>,
        queue,
    )
}
