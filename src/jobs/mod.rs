//! Background job scheduling and workers

use std::sync::Arc;

use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

use crate::services::ResetService;

/// Initialize and start the job scheduler
pub async fn start_scheduler(reset_service: Arc<ResetService>) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    // Demo dataset reset - run nightly at 4 AM. A no-op unless the reset
    // feature is enabled.
    let reset = reset_service.clone();
    let reset_job = Job::new_async("0 0 4 * * *", move |_uuid, _l| {
        let reset = reset.clone();
        Box::pin(async move {
            info!("Running scheduled database reset");
            if let Err(e) = reset.reset().await {
                tracing::error!("Database reset error: {}", e);
            }
        })
    })?;
    scheduler.add(reset_job).await?;

    scheduler.start().await?;
    Ok(scheduler)
}
