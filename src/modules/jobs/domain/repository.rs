/// Persistence of the job queue
use crate::modules::jobs::domain::entities::{Job, JobRecord};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn enqueue(&self, job: Job) -> AppResult<JobRecord>;

    /// Claim the next pending job (priority, then age) and mark it running.
    /// Concurrent workers never claim the same job.
    async fn dequeue(&self) -> AppResult<Option<JobRecord>>;

    async fn mark_completed(&self, job_id: Uuid) -> AppResult<()>;

    /// Back to pending while `retryable` and attempts remain, failed otherwise
    async fn mark_failed(&self, job_id: Uuid, error: &str, retryable: bool) -> AppResult<()>;

    async fn update_progress(&self, job_id: Uuid, progress: &str) -> AppResult<()>;

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>>;

    /// In dequeue order
    async fn get_pending_jobs(&self) -> AppResult<Vec<JobRecord>>;

    /// Newest first
    async fn get_jobs_for_chapter(&self, chapter_id: i32) -> AppResult<Vec<JobRecord>>;

    /// Fail a pending or running job; `false` if it had already finished
    async fn cancel(&self, job_id: Uuid) -> AppResult<bool>;

    async fn purge_pending(&self) -> AppResult<usize>;

    /// Delete finished jobs older than `days`
    async fn delete_old_completed(&self, days: i32) -> AppResult<usize>;

    async fn get_statistics(&self) -> AppResult<JobStatistics>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatistics {
    pub pending_count: i64,
    pub running_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub total_count: i64,
}
