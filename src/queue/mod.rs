//! Merge queue state
//!
//! Holds the per-pull-request records for each tracked repository and the
//! driver that drains them one build at a time.

mod command;
mod driver;
mod state;

pub use command::{Command, CommandContext, parse_commands};
pub use driver::{DriveOutcome, DriveReport, TrackedRepo, drive, drive_repo};
pub use state::{BuildResult, BuildStatus, PullRequestState, order_queue};

use std::collections::BTreeMap;

/// Why a change is held out of the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hold {
    /// Head commit the hold applies to
    pub head_commit: String,
    /// Human-readable reason
    pub reason: String,
}

/// All tracked pull requests of one repository
///
/// A change whose trial merge failed is held until its head moves or an
/// authorized command changes its state.
#[derive(Debug, Clone, Default)]
pub struct RepoQueue {
    pulls: BTreeMap<u64, PullRequestState>,
    holds: BTreeMap<u64, Hold>,
}

impl RepoQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a state unless one already exists for its number.
    ///
    /// Returns false if the number was already tracked.
    pub fn insert(&mut self, state: PullRequestState) -> bool {
        if self.pulls.contains_key(&state.number) {
            return false;
        }
        self.pulls.insert(state.number, state);
        true
    }

    /// Stop tracking a pull request
    pub fn remove(&mut self, number: u64) -> Option<PullRequestState> {
        self.holds.remove(&number);
        self.pulls.remove(&number)
    }

    /// State for `number`
    pub fn get(&self, number: u64) -> Option<&PullRequestState> {
        self.pulls.get(&number)
    }

    /// Mutable state for `number`
    pub fn get_mut(&mut self, number: u64) -> Option<&mut PullRequestState> {
        self.pulls.get_mut(&number)
    }

    /// All states by number
    pub fn states(&self) -> impl Iterator<Item = &PullRequestState> {
        self.pulls.values()
    }

    /// All states by number, mutably
    pub fn states_mut(&mut self) -> impl Iterator<Item = &mut PullRequestState> {
        self.pulls.values_mut()
    }

    /// Number of tracked pull requests
    pub fn len(&self) -> usize {
        self.pulls.len()
    }

    /// Whether no pull requests are tracked
    pub fn is_empty(&self) -> bool {
        self.pulls.is_empty()
    }

    /// Pull request numbers in queue order
    pub fn ordered_numbers(&self) -> Vec<u64> {
        order_queue(self.pulls.values())
            .into_iter()
            .map(|s| s.number)
            .collect()
    }

    /// Hold a change at its current head
    pub fn hold(&mut self, number: u64, reason: impl Into<String>) {
        if let Some(state) = self.pulls.get(&number) {
            self.holds.insert(
                number,
                Hold {
                    head_commit: state.head_commit.clone(),
                    reason: reason.into(),
                },
            );
        }
    }

    /// Release a hold; returns it if one existed
    pub fn release(&mut self, number: u64) -> Option<Hold> {
        self.holds.remove(&number)
    }

    /// Active hold for `number`, ignoring holds for an outdated head
    pub fn hold_for(&self, number: u64) -> Option<&Hold> {
        let state = self.pulls.get(&number)?;
        self.holds
            .get(&number)
            .filter(|h| h.head_commit == state.head_commit)
    }

    /// Number of changes currently testing
    pub fn testing_count(&self) -> usize {
        self.pulls
            .values()
            .filter(|s| s.status == BuildStatus::Testing)
            .count()
    }
}
