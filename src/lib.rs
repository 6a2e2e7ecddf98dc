//! mergeq - a serialized merge queue for GitHub pull requests
//!
//! Reviewers approve and prioritize pull requests with comment commands
//! (`r+`, `r=name`, `r-`, `p=N`, `retry`). The queue tests one trial merge
//! per repository at a time on a CI branch and promotes candidates whose
//! builders all pass.

pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod merge;
pub mod platform;
pub mod queue;
pub mod types;
