//! Check command - validate configuration without touching the provider

use mergeq::config::load_config;
use mergeq::error::Result;
use std::path::Path;

/// Validate the configuration file and summarize it
pub fn run_check(path: &Path) -> Result<()> {
    let config = load_config(path)?;

    println!("{}: ok", path.display());
    for repo in &config.repos {
        println!(
            "  {} {} <- {} (ci: {}) reviewers={} builders={}",
            repo.repo_id(),
            repo.target_branch,
            repo.scratch_branch,
            repo.ci_branch,
            repo.reviewers.len(),
            repo.builders.len()
        );
    }
    Ok(())
}
