//! Serve command - run the coordinator with a periodic drive tick

use crate::cli::context::ServiceContext;
use mergeq::bootstrap::bootstrap;
use mergeq::coordinator::{Coordinator, DEFAULT_CHANNEL_CAPACITY};
use mergeq::error::Result;
use std::path::Path;
use tracing::{info, warn};

/// Options for the serve command
#[derive(Debug, Clone, Copy, Default)]
pub struct ServeOptions {
    /// Run a single drive pass and exit
    pub once: bool,
}

/// Load state, then drive the queues until interrupted
pub async fn run_serve(path: &Path, options: ServeOptions) -> Result<()> {
    let ctx = ServiceContext::new(path)?;
    let tick = ctx.config.main.tick_interval();
    let repos = bootstrap(ctx.services, &ctx.config.main.status_context).await?;

    let (handle, task) = Coordinator::new(repos).spawn(DEFAULT_CHANNEL_CAPACITY);

    let report = handle.drive_now().await?;
    info!(started = report.started_count(), "initial drive pass complete");

    if options.once {
        drop(handle);
        let _ = task.await;
        return Ok(());
    }

    let mut interval = tokio::time::interval(tick);
    // The first tick fires immediately; the initial pass already ran.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = handle.drive_now().await {
                    warn!(error = %e, "periodic drive failed");
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    drop(handle);
    let _ = task.await;
    Ok(())
}
