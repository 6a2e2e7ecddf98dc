//! Mock hosting service for testing
//!
//! Keeps branches, pull requests, comments and statuses in memory so tests
//! can assert on the end state as well as on the calls made.

#![allow(dead_code)]

use async_trait::async_trait;
use mergeq::error::{Error, Result};
use mergeq::platform::HostingService;
use mergeq::types::{CommitState, CommitStatus, PullRequest, RepoId, ReviewComment};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListOpenPulls,
    GetPull(u64),
    ListReviewComments(u64),
    ListStatuses(String),
    GetBranchHead(String),
    UpdateBranch {
        branch: String,
        sha: String,
        force: bool,
    },
    CreateBranch {
        branch: String,
        sha: String,
    },
    Merge {
        base: String,
        head: String,
        message: String,
    },
    CreateStatus {
        sha: String,
        state: CommitState,
        description: String,
    },
}

impl Call {
    /// Whether the call changes a ref (branch update, creation or merge)
    pub const fn mutates_refs(&self) -> bool {
        matches!(
            self,
            Self::UpdateBranch { .. } | Self::CreateBranch { .. } | Self::Merge { .. }
        )
    }
}

/// In-memory provider for one repository
///
/// Features:
/// - Branch refs with GitHub-like failure on updating a missing ref
/// - Fast-forward checks for non-forced updates, using merge parents
/// - Deterministic merge commit shas (`merge_1`, `merge_2`, ...)
/// - Call tracking for verification
/// - Error injection per operation name
pub struct MockHostingService {
    repo: RepoId,
    next_merge: AtomicU64,
    pulls: Mutex<BTreeMap<u64, PullRequest>>,
    comments: Mutex<HashMap<u64, Vec<ReviewComment>>>,
    statuses: Mutex<HashMap<String, Vec<CommitStatus>>>,
    branches: Mutex<HashMap<String, String>>,
    /// Merge commit -> the base tip it was created on
    parents: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<&'static str, String>>,
}

impl MockHostingService {
    /// Create a mock for `acme/widgets` with `master` at `base_sha`
    pub fn new() -> Self {
        let mock = Self::with_repo(RepoId::new("acme", "widgets"));
        mock.set_branch("master", "base_sha");
        mock
    }

    /// Create an empty mock for `repo`
    pub fn with_repo(repo: RepoId) -> Self {
        Self {
            repo,
            next_merge: AtomicU64::new(1),
            pulls: Mutex::new(BTreeMap::new()),
            comments: Mutex::new(HashMap::new()),
            statuses: Mutex::new(HashMap::new()),
            branches: Mutex::new(HashMap::new()),
            parents: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
        }
    }

    // === Setup ===

    /// Add an open pull request
    pub fn add_pull(&self, number: u64, head_sha: &str) {
        self.pulls.lock().unwrap().insert(
            number,
            PullRequest {
                number,
                head_sha: head_sha.to_string(),
                title: format!("PR {number}"),
            },
        );
    }

    /// Simulate a push to a pull request
    pub fn set_remote_head(&self, number: u64, head_sha: &str) {
        if let Some(pr) = self.pulls.lock().unwrap().get_mut(&number) {
            pr.head_sha = head_sha.to_string();
        }
    }

    /// Add a review comment
    pub fn add_comment(&self, number: u64, author: &str, body: &str, commit_id: &str) {
        self.comments
            .lock()
            .unwrap()
            .entry(number)
            .or_default()
            .push(ReviewComment {
                author: author.to_string(),
                body: body.to_string(),
                commit_id: Some(commit_id.to_string()),
            });
    }

    /// Add a status on `sha` as the newest entry
    pub fn add_status(&self, sha: &str, state: &str, context: &str) {
        self.statuses
            .lock()
            .unwrap()
            .entry(sha.to_string())
            .or_default()
            .insert(
                0,
                CommitStatus {
                    state: state.to_string(),
                    context: context.to_string(),
                    description: None,
                },
            );
    }

    /// Point a branch at `sha`
    pub fn set_branch(&self, branch: &str, sha: &str) {
        self.branches
            .lock()
            .unwrap()
            .insert(branch.to_string(), sha.to_string());
    }

    // === Error injection ===

    /// Make operation `op` (trait method name) fail with `msg`
    pub fn fail(&self, op: &'static str, msg: &str) {
        self.failures.lock().unwrap().insert(op, msg.to_string());
    }

    /// Stop failing operation `op`
    pub fn heal(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    fn injected(&self, op: &'static str) -> Result<()> {
        match self.failures.lock().unwrap().get(op) {
            Some(msg) => Err(Error::Platform(msg.clone())),
            None => Ok(()),
        }
    }

    /// Whether `ancestor` is reachable from `sha` through merge parents
    fn descends_from(&self, sha: &str, ancestor: &str) -> bool {
        let parents = self.parents.lock().unwrap();
        let mut current = sha;
        loop {
            if current == ancestor {
                return true;
            }
            match parents.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    // === Verification ===

    /// Current tip of a branch
    pub fn branch(&self, branch: &str) -> Option<String> {
        self.branches.lock().unwrap().get(branch).cloned()
    }

    /// All calls made so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Calls that changed refs
    pub fn ref_mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(Call::mutates_refs)
            .collect()
    }

    /// Merge calls made so far
    pub fn merge_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Merge { .. }))
            .collect()
    }

    /// Statuses on `sha`, newest first
    pub fn statuses_for(&self, sha: &str) -> Vec<CommitStatus> {
        self.statuses
            .lock()
            .unwrap()
            .get(sha)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl HostingService for MockHostingService {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn list_open_pulls(&self) -> Result<Vec<PullRequest>> {
        self.record(Call::ListOpenPulls);
        self.injected("list_open_pulls")?;
        Ok(self.pulls.lock().unwrap().values().cloned().collect())
    }

    async fn get_pull(&self, number: u64) -> Result<PullRequest> {
        self.record(Call::GetPull(number));
        self.injected("get_pull")?;
        self.pulls
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("pull {number}")))
    }

    async fn list_review_comments(&self, number: u64) -> Result<Vec<ReviewComment>> {
        self.record(Call::ListReviewComments(number));
        self.injected("list_review_comments")?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_statuses(&self, sha: &str) -> Result<Vec<CommitStatus>> {
        self.record(Call::ListStatuses(sha.to_string()));
        self.injected("list_statuses")?;
        Ok(self.statuses_for(sha))
    }

    async fn get_branch_head(&self, branch: &str) -> Result<String> {
        self.record(Call::GetBranchHead(branch.to_string()));
        self.injected("get_branch_head")?;
        self.branch(branch)
            .ok_or_else(|| Error::NotFound(format!("heads/{branch}")))
    }

    async fn update_branch(&self, branch: &str, sha: &str, force: bool) -> Result<()> {
        self.record(Call::UpdateBranch {
            branch: branch.to_string(),
            sha: sha.to_string(),
            force,
        });
        self.injected("update_branch")?;

        let Some(tip) = self.branch(branch) else {
            return Err(Error::Http {
                status: 422,
                message: "Reference does not exist".to_string(),
            });
        };
        if !force && !self.descends_from(sha, &tip) {
            return Err(Error::Http {
                status: 422,
                message: "Update is not a fast forward".to_string(),
            });
        }
        self.set_branch(branch, sha);
        Ok(())
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.record(Call::CreateBranch {
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        self.injected("create_branch")?;

        let mut branches = self.branches.lock().unwrap();
        if branches.contains_key(branch) {
            return Err(Error::Http {
                status: 422,
                message: "Reference already exists".to_string(),
            });
        }
        branches.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn merge(&self, base: &str, head: &str, message: &str) -> Result<String> {
        self.record(Call::Merge {
            base: base.to_string(),
            head: head.to_string(),
            message: message.to_string(),
        });
        self.injected("merge")?;

        let mut branches = self.branches.lock().unwrap();
        let Some(tip) = branches.get_mut(base) else {
            return Err(Error::NotFound(format!("heads/{base}")));
        };
        let sha = format!("merge_{}", self.next_merge.fetch_add(1, Ordering::SeqCst));
        self.parents
            .lock()
            .unwrap()
            .insert(sha.clone(), tip.clone());
        *tip = sha.clone();
        Ok(sha)
    }

    async fn create_status(
        &self,
        sha: &str,
        state: CommitState,
        description: &str,
        _target_url: Option<&str>,
    ) -> Result<()> {
        self.record(Call::CreateStatus {
            sha: sha.to_string(),
            state,
            description: description.to_string(),
        });
        self.injected("create_status")?;
        self.add_status(sha, state.as_str(), "merge-queue");
        Ok(())
    }
}
