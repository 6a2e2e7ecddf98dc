//! Trial-merge engine
//!
//! Two-phase pattern:
//! 1. Plan - decide branches and messages (pure, testable)
//! 2. Execute - sync branches, merge, trigger CI (effectful)
//!
//! Promotion handles the other end, once every builder has reported.

mod execute;
mod plan;
mod promote;

pub use execute::{AttemptOutcome, Freshness, attempt_trial_merge, check_freshness, ensure_branch};
pub use plan::{
    TrialMergePlan, failure_description, merge_message, pending_description, plan_trial_merge,
    success_description,
};
pub use promote::{promote_candidate, report_failure};
