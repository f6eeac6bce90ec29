use crate::modules::jobs::domain::entities::{Job, JobRecord, JobStatus, CANCELLED_ERROR};
use crate::modules::jobs::domain::repository::{JobRepository, JobStatistics};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Job queue held in process memory; jobs are kept in insertion order
#[derive(Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<Vec<JobRecord>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> AppResult<MutexGuard<'_, Vec<JobRecord>>> {
        self.jobs
            .lock()
            .map_err(|_| AppError::InternalError("In-memory job queue is poisoned".to_string()))
    }

    fn with_job<T>(&self, job_id: Uuid, f: impl FnOnce(&mut JobRecord) -> T) -> AppResult<T> {
        let mut jobs = self.jobs()?;
        let job = jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))?;
        Ok(f(job))
    }
}

#[async_trait]
impl JobRepository for InMemoryJobRepository {
    async fn enqueue(&self, job: Job) -> AppResult<JobRecord> {
        let record = JobRecord {
            id: Uuid::new_v4(),
            job_type: job.job_type.to_string(),
            payload: job.payload,
            priority: job.priority,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: job.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS),
            progress: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        };
        self.jobs()?.push(record.clone());
        Ok(record)
    }

    async fn dequeue(&self) -> AppResult<Option<JobRecord>> {
        let mut jobs = self.jobs()?;
        let next = jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending && j.attempts < j.max_attempts)
            .min_by_key(|j| (j.priority, j.created_at));

        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
            job.progress = None;
            job.attempts += 1;
            job.clone()
        }))
    }

    async fn mark_completed(&self, job_id: Uuid) -> AppResult<()> {
        self.with_job(job_id, |job| {
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.error = None;
        })
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, retryable: bool) -> AppResult<()> {
        self.with_job(job_id, |job| {
            if retryable && job.can_retry() {
                job.status = JobStatus::Pending;
                job.completed_at = None;
            } else {
                job.status = JobStatus::Failed;
                job.completed_at = Some(Utc::now());
            }
            job.started_at = None;
            job.error = Some(error.to_string());
        })
    }

    async fn update_progress(&self, job_id: Uuid, progress: &str) -> AppResult<()> {
        // Missing rows are ignored the same way an UPDATE matching nothing is
        let mut jobs = self.jobs()?;
        if let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) {
            job.progress = Some(progress.to_string());
        }
        Ok(())
    }

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        Ok(self.jobs()?.iter().find(|j| j.id == job_id).cloned())
    }

    async fn get_pending_jobs(&self) -> AppResult<Vec<JobRecord>> {
        let mut pending: Vec<_> = self
            .jobs()?
            .iter()
            .filter(|j| j.status == JobStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|j| (j.priority, j.created_at));
        Ok(pending)
    }

    async fn get_jobs_for_chapter(&self, chapter_id: i32) -> AppResult<Vec<JobRecord>> {
        let mut jobs: Vec<_> = self
            .jobs()?
            .iter()
            .filter(|j| j.chapter_id() == Some(chapter_id))
            .cloned()
            .collect();
        jobs.reverse();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn cancel(&self, job_id: Uuid) -> AppResult<bool> {
        let mut jobs = self.jobs()?;
        let Some(job) = jobs.iter_mut().find(|j| j.id == job_id) else {
            return Ok(false);
        };
        if !matches!(job.status, JobStatus::Pending | JobStatus::Running) {
            return Ok(false);
        }

        job.status = JobStatus::Failed;
        job.error = Some(CANCELLED_ERROR.to_string());
        job.completed_at = Some(Utc::now());
        Ok(true)
    }

    async fn purge_pending(&self) -> AppResult<usize> {
        let mut jobs = self.jobs()?;
        let before = jobs.len();
        jobs.retain(|j| j.status != JobStatus::Pending);
        Ok(before - jobs.len())
    }

    async fn delete_old_completed(&self, days: i32) -> AppResult<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(days));
        let mut jobs = self.jobs()?;
        let before = jobs.len();
        jobs.retain(|j| {
            let finished = matches!(j.status, JobStatus::Completed | JobStatus::Failed);
            !(finished && j.completed_at.is_some_and(|at| at <= cutoff))
        });
        Ok(before - jobs.len())
    }

    async fn get_statistics(&self) -> AppResult<JobStatistics> {
        let jobs = self.jobs()?;
        let mut stats = JobStatistics::default();
        for job in jobs.iter() {
            match job.status {
                JobStatus::Pending => stats.pending_count += 1,
                JobStatus::Running => stats.running_count += 1,
                JobStatus::Completed => stats.completed_count += 1,
                JobStatus::Failed => stats.failed_count += 1,
            }
            stats.total_count += 1;
        }
        Ok(stats)
    }
}
