use crate::errors::AdminError;
use crate::storage;
use sea_orm::DatabaseConnection;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Starts the background scheduler. Expired admin sessions are purged hourly.
pub async fn init_scheduler(db: DatabaseConnection) -> Result<JobScheduler, AdminError> {
    let sched = JobScheduler::new()
        .await
        .map_err(|e| AdminError::Other(format!("Failed to create job scheduler: {e}")))?;

    let cleanup_sessions_job = Job::new_async("0 0 * * * *", move |_uuid, _l| {
        let db = db.clone();
        Box::pin(async move {
            match storage::cleanup_expired_admin_sessions(&db).await {
                Ok(count) => info!(count, "cleaned up expired admin sessions"),
                Err(e) => error!(error = %e, "failed to clean up expired admin sessions"),
            }
        })
    })
    .map_err(|e| AdminError::Other(format!("Failed to create cleanup sessions job: {e}")))?;

    sched
        .add(cleanup_sessions_job)
        .await
        .map_err(|e| AdminError::Other(format!("Failed to add cleanup sessions job: {e}")))?;

    sched
        .start()
        .await
        .map_err(|e| AdminError::Other(format!("Failed to start job scheduler: {e}")))?;

    info!("Job scheduler started");
    Ok(sched)
}
