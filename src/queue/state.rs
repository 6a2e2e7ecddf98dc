//! Per-pull-request queue state and its ordering rule

use crate::types::CommitState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Overall build status of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildStatus {
    /// Not yet tested (or reset for retry)
    #[default]
    Untested,
    /// A trial merge is being built
    Testing,
    /// Every builder passed
    Success,
    /// At least one builder failed
    Failure,
}

impl BuildStatus {
    /// Initial status derived from the newest status we reported.
    ///
    /// `pending` means a build may still be running, so the change keeps
    /// occupying the build slot.
    pub const fn from_commit_state(state: Option<CommitState>) -> Self {
        match state {
            Some(CommitState::Pending) => Self::Testing,
            Some(CommitState::Success) => Self::Success,
            Some(CommitState::Failure | CommitState::Error) => Self::Failure,
            None => Self::Untested,
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Untested => "untested",
            Self::Testing => "testing",
            Self::Success => "success",
            Self::Failure => "failure",
        };
        f.pad(s)
    }
}

/// Result reported by a single builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BuildResult {
    /// Builder has not reported yet
    #[default]
    Unknown,
    /// Builder started but has not finished
    Pending,
    /// Builder passed
    Success,
    /// Builder failed
    Failure,
}

impl BuildResult {
    /// Whether the builder has reached a final verdict
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }
}

/// Queue state of one pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestState {
    /// PR number, immutable
    pub number: u64,
    /// Head commit as last observed
    pub head_commit: String,
    /// Pull request title, empty if not known
    #[serde(default)]
    pub title: String,
    /// Build status
    pub status: BuildStatus,
    /// Approver login; empty means not approved
    pub approved_by: String,
    /// Higher is more urgent
    pub priority: i64,
    /// Trial merge commit, set once testing starts
    pub merge_commit: Option<String>,
    /// Per-builder results for the current trial merge
    pub build_results: BTreeMap<String, BuildResult>,
    /// When the current trial build started
    pub testing_since: Option<DateTime<Utc>>,
}

impl PullRequestState {
    /// New state for a pull request
    pub fn new(number: u64, head_commit: impl Into<String>, status: BuildStatus) -> Self {
        Self {
            number,
            head_commit: head_commit.into(),
            title: String::new(),
            status,
            approved_by: String::new(),
            priority: 0,
            merge_commit: None,
            build_results: BTreeMap::new(),
            testing_since: None,
        }
    }

    /// Whether a reviewer has approved this change
    pub const fn is_approved(&self) -> bool {
        !self.approved_by.is_empty()
    }

    /// Whether the driver may start a trial merge for this change
    pub const fn is_eligible(&self) -> bool {
        matches!(self.status, BuildStatus::Untested) && self.is_approved()
    }

    /// Move to `Testing` for the given trial merge
    pub fn start_testing<'a, I>(&mut self, merge_commit: String, builders: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.status = BuildStatus::Testing;
        self.merge_commit = Some(merge_commit);
        self.build_results = builders
            .into_iter()
            .map(|b| (b.clone(), BuildResult::Unknown))
            .collect();
        self.testing_since = Some(Utc::now());
    }

    /// Forget any trial merge and return to `Untested`
    pub fn reset_build(&mut self) {
        self.status = BuildStatus::Untested;
        self.merge_commit = None;
        self.build_results.clear();
        self.testing_since = None;
    }

    /// Adopt a new head commit: approval and any trial merge are dropped.
    ///
    /// Returns false if `head_commit` is already the current head.
    pub fn sync_head(&mut self, head_commit: String) -> bool {
        if self.head_commit == head_commit {
            return false;
        }
        self.head_commit = head_commit;
        self.approved_by.clear();
        self.reset_build();
        true
    }

    /// Record a builder's result for the current trial merge.
    ///
    /// Returns false if `builder` is not expected for this build.
    pub fn record_build_result(&mut self, builder: &str, result: BuildResult) -> bool {
        match self.build_results.get_mut(builder) {
            Some(slot) => {
                *slot = result;
                true
            }
            None => false,
        }
    }

    /// Overall verdict once every builder has reported.
    ///
    /// Any failure fails the build; otherwise every builder passed.
    pub fn build_verdict(&self) -> Option<BuildStatus> {
        if self.build_results.is_empty() || !self.build_results.values().all(|r| r.is_final()) {
            return None;
        }
        if self
            .build_results
            .values()
            .any(|r| *r == BuildResult::Failure)
        {
            Some(BuildStatus::Failure)
        } else {
            Some(BuildStatus::Success)
        }
    }

    /// Sort key: approved first, then priority descending, then number
    fn sort_key(&self) -> (bool, std::cmp::Reverse<i64>, u64) {
        (
            !self.is_approved(),
            std::cmp::Reverse(self.priority),
            self.number,
        )
    }

    /// Queue ordering between two states of the same repository
    pub fn queue_cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl std::fmt::Display for PullRequestState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} (approved_by={:?}, priority={}, status={})",
            self.number, self.approved_by, self.priority, self.status
        )
    }
}

/// Order states for draining: the repository queue view
pub fn order_queue<'a, I>(states: I) -> Vec<&'a PullRequestState>
where
    I: IntoIterator<Item = &'a PullRequestState>,
{
    let mut ordered: Vec<_> = states.into_iter().collect();
    ordered.sort_by(|a, b| a.queue_cmp(b));
    ordered
}
