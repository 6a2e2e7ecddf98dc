//! Status command - print each repository's queue without driving it

use crate::cli::context::ServiceContext;
use mergeq::bootstrap::bootstrap;
use mergeq::error::Result;
use mergeq::types::short_sha;
use std::path::Path;

/// Load every repository from the provider and print its queue order
pub async fn run_status(path: &Path) -> Result<()> {
    let ctx = ServiceContext::new(path)?;
    let repos = bootstrap(ctx.services, &ctx.config.main.status_context).await?;

    for repo in &repos {
        println!("{}", repo.full_name());
        if repo.queue.is_empty() {
            println!("  (no open pull requests)");
            continue;
        }
        for number in repo.queue.ordered_numbers() {
            let Some(state) = repo.queue.get(number) else {
                continue;
            };
            let approver = if state.is_approved() {
                state.approved_by.as_str()
            } else {
                "-"
            };
            let since = state
                .testing_since
                .map(|t| format!(" (since {})", t.format("%Y-%m-%d %H:%M UTC")))
                .unwrap_or_default();
            println!(
                "  #{:<6} {:<9} p={:<3} r={:<16} {} {}{since}",
                state.number,
                state.status,
                state.priority,
                approver,
                short_sha(&state.head_commit),
                state.title
            );
        }
    }
    Ok(())
}
