//! Hosting provider services
//!
//! The queue only talks to the provider through [`HostingService`], so the
//! same driver logic runs against GitHub or an in-memory double.

mod github;
mod retry;

pub use github::GitHubService;
pub use retry::RetryPolicy;

use crate::error::Result;
use crate::types::{CommitState, CommitStatus, PullRequest, RepoId, ReviewComment};
use async_trait::async_trait;

/// Provider operations for a single repository
///
/// Implementations are bound to one repository at construction time.
#[async_trait]
pub trait HostingService: Send + Sync {
    /// Repository this service operates on
    fn repo(&self) -> &RepoId;

    /// List all open pull requests
    async fn list_open_pulls(&self) -> Result<Vec<PullRequest>>;

    /// Fetch a single pull request (the authoritative head commit)
    async fn get_pull(&self, number: u64) -> Result<PullRequest>;

    /// List review comments on a pull request, oldest first
    async fn list_review_comments(&self, number: u64) -> Result<Vec<ReviewComment>>;

    /// List statuses for a commit, newest first
    async fn list_statuses(&self, sha: &str) -> Result<Vec<CommitStatus>>;

    /// Read the tip commit of a branch
    async fn get_branch_head(&self, branch: &str) -> Result<String>;

    /// Move an existing branch to `sha`
    ///
    /// Fails if the branch does not exist, or if `force` is false and the
    /// update is not a fast-forward.
    async fn update_branch(&self, branch: &str, sha: &str, force: bool) -> Result<()>;

    /// Create a new branch at `sha`
    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()>;

    /// Merge `head` into branch `base`, returning the new merge commit sha
    async fn merge(&self, base: &str, head: &str, message: &str) -> Result<String>;

    /// Create a commit status on `sha`
    async fn create_status(
        &self,
        sha: &str,
        state: CommitState,
        description: &str,
        target_url: Option<&str>,
    ) -> Result<()>;
}
