//! Queue driver - fills each repository's single build slot
//!
//! Walks every repository's queue in order. A change already testing
//! occupies the slot; otherwise the highest-ordered eligible change gets a
//! trial merge. Failures are held and skipped so one broken change cannot stall
//! the rest of the queue or other repositories. A change found stale adopts
//! the provider's head and waits for a fresh approval.

use crate::config::RepoConfig;
use crate::merge::{AttemptOutcome, attempt_trial_merge};
use crate::platform::HostingService;
use crate::queue::{BuildStatus, RepoQueue};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error};

/// A tracked repository: static config, provider access and queue state
pub struct TrackedRepo {
    /// Repository configuration
    pub config: RepoConfig,
    /// Provider service bound to this repository
    pub service: Arc<dyn HostingService>,
    /// Pull request states
    pub queue: RepoQueue,
}

impl TrackedRepo {
    /// Bundle config, service and queue
    pub fn new(config: RepoConfig, service: Arc<dyn HostingService>, queue: RepoQueue) -> Self {
        Self {
            config,
            service,
            queue,
        }
    }

    /// `owner/name` of this repository
    pub fn full_name(&self) -> String {
        self.config.repo_id().full_name()
    }
}

/// What one drive pass did for one repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveOutcome {
    /// Change occupying the build slot after the pass
    pub testing: Option<u64>,
    /// Change whose trial merge was started by this pass
    pub started: Option<u64>,
    /// Changes aborted because their head moved
    pub stale: Vec<u64>,
    /// Changes whose trial merge failed
    pub failed: Vec<u64>,
}

/// What one drive pass did, keyed by repository full name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveReport {
    /// Per-repository outcomes
    pub repos: BTreeMap<String, DriveOutcome>,
}

impl DriveReport {
    /// Outcome for a repository
    pub fn repo(&self, full_name: &str) -> Option<&DriveOutcome> {
        self.repos.get(full_name)
    }

    /// Total trial merges started in this pass
    pub fn started_count(&self) -> usize {
        self.repos.values().filter(|o| o.started.is_some()).count()
    }
}

/// Drive every tracked repository once
pub async fn drive(repos: &mut [TrackedRepo]) -> DriveReport {
    let mut report = DriveReport::default();
    for repo in repos.iter_mut() {
        let outcome = drive_repo(repo).await;
        report.repos.insert(repo.full_name(), outcome);
    }
    report
}

/// Drive one repository's queue until its build slot is occupied
pub async fn drive_repo(repo: &mut TrackedRepo) -> DriveOutcome {
    let full_name = repo.full_name();
    let mut outcome = DriveOutcome::default();

    // A build in flight keeps the slot even if a higher-ordered change
    // became eligible while it runs.
    if let Some(testing) = repo
        .queue
        .states()
        .find(|s| s.status == BuildStatus::Testing)
    {
        debug!(repo = %full_name, pr = testing.number, "build slot occupied");
        outcome.testing = Some(testing.number);
        return outcome;
    }

    for number in repo.queue.ordered_numbers() {
        let Some(state) = repo.queue.get(number) else {
            continue;
        };
        if !state.is_eligible() {
            continue;
        }
        if let Some(hold) = repo.queue.hold_for(number) {
            debug!(repo = %full_name, pr = number, reason = %hold.reason, "skipping held change");
            continue;
        }

        let Some(state) = repo.queue.get_mut(number) else {
            continue;
        };

        match attempt_trial_merge(repo.service.as_ref(), &repo.config, state).await {
            Ok(AttemptOutcome::Started { .. }) => {
                outcome.testing = Some(number);
                outcome.started = Some(number);
                break;
            }
            Ok(AttemptOutcome::Stale { remote_head }) => {
                // The approval was given for a commit that is no longer the
                // head; a reviewer has to approve the new one.
                state.sync_head(remote_head);
                repo.queue.release(number);
                outcome.stale.push(number);
            }
            Err(e) => {
                error!(
                    repo = %full_name,
                    pr = number,
                    error = %e,
                    "trial merge failed, holding change until it is updated or re-approved"
                );
                repo.queue.hold(number, e.to_string());
                outcome.failed.push(number);
            }
        }
    }

    outcome
}
