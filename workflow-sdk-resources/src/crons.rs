//! Cron job client.

use crate::error::ResourceResult;
use crate::payload::to_payload;
use crate::types::{CreateCron, Cron, CronSearch, Run};
use tracing::debug;
use workflow_sdk_http::{CallOptions, HttpClient};

/// Client for scheduled runs.
///
/// # Example
///
/// ```ignore
/// use workflow_sdk_resources::{CreateCron, CronsClient};
///
/// let crons = CronsClient::new(http);
/// let run = crons
///     .create(CreateCron::new("agent", "0 9 * * *"), &CallOptions::new())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct CronsClient {
    http: HttpClient,
}

impl CronsClient {
    /// Create a client over an HTTP client.
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Schedule a cron job on a thread.
    pub async fn create_for_thread(
        &self,
        thread_id: &str,
        cron: CreateCron,
        options: &CallOptions,
    ) -> ResourceResult<Run> {
        let payload = to_payload(&cron)?;
        debug!(thread_id, schedule = %cron.schedule, "Creating thread cron");
        let path = format!("/threads/{thread_id}/runs/crons");
        Ok(self.http.post(&path, Some(payload), options).await?)
    }

    /// Schedule a cron job that creates a new thread on each run.
    pub async fn create(&self, cron: CreateCron, options: &CallOptions) -> ResourceResult<Run> {
        let payload = to_payload(&cron)?;
        debug!(schedule = %cron.schedule, "Creating cron");
        Ok(self.http.post("/runs/crons", Some(payload), options).await?)
    }

    /// Delete a cron job.
    pub async fn delete(&self, cron_id: &str, options: &CallOptions) -> ResourceResult<()> {
        let path = format!("/runs/crons/{cron_id}");
        Ok(self.http.delete(&path, None, options).await?)
    }

    /// Search cron jobs.
    pub async fn search(&self, search: CronSearch, options: &CallOptions) -> ResourceResult<Vec<Cron>> {
        let payload = to_payload(&search.normalized())?;
        Ok(self
            .http
            .post("/runs/crons/search", Some(payload), options)
            .await?)
    }
}
