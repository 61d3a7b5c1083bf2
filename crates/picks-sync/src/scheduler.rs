use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::SyncConfig;
use crate::pipeline::Pipeline;

/// Cron scheduler running the pipeline, or `None` when scheduling is disabled. Overlapping
/// runs are allowed; the store's merge-upsert keeps them consistent.
pub async fn maybe_build_scheduler(
    config: &SyncConfig,
    pipeline: Arc<Pipeline>,
) -> Result<Option<JobScheduler>> {
    if !config.scheduler_enabled {
        return Ok(None);
    }

    let sched = JobScheduler::new().await.context("creating scheduler")?;
    let cron = config.sync_cron.as_str();
    let job = Job::new_async(cron, move |_uuid, _l| {
        let pipeline = Arc::clone(&pipeline);
        Box::pin(async move {
            match pipeline.run_once().await {
                Ok(summary) => info!(
                    run_id = %summary.run_id,
                    new = summary.stats.new_picks_added,
                    "scheduled run finished"
                ),
                Err(failure) => error!(
                    run_id = %failure.run_id,
                    error = %failure.error,
                    "scheduled run failed"
                ),
            }
        })
    })
    .with_context(|| format!("creating scheduler job for cron {cron}"))?;
    sched.add(job).await.context("adding scheduler job")?;
    info!(cron, "scheduler configured");
    Ok(Some(sched))
}
