/// Background worker for translation jobs
///
/// Polls the queue, runs one job at a time under the hard time limit and
/// records the outcome on the job row. Start it with `tokio::spawn`.
use crate::modules::jobs::domain::entities::{
    Job, JobRecord, JobType, TranslateChapterPayload, TranslateChapterTitlePayload,
    TranslateNovelTitlePayload,
};
use crate::modules::jobs::domain::repository::JobRepository;
use crate::modules::translation::TranslationService;
use crate::shared::application::ProgressReporter;
use crate::shared::config::JobQueueConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::LogContext;
use crate::{log_debug, log_error, log_info, log_warn};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub const STARTED_PROGRESS: &str = "Started";

/// Persists progress messages on the job row
pub struct JobProgressReporter {
    job_repository: Arc<dyn JobRepository>,
    job_id: Uuid,
}

impl JobProgressReporter {
    pub fn new(job_repository: Arc<dyn JobRepository>, job_id: Uuid) -> Self {
        Self {
            job_repository,
            job_id,
        }
    }
}

#[async_trait]
impl ProgressReporter for JobProgressReporter {
    async fn report(&self, status: &str) {
        LogContext::job_progress(&self.job_id.to_string(), status);
        if let Err(e) = self.job_repository.update_progress(self.job_id, status).await {
            log_debug!("Could not store progress of job {}: {}", self.job_id, e);
        }
    }
}

pub struct BackgroundWorker {
    job_repository: Arc<dyn JobRepository>,
    translation_service: Arc<TranslationService>,
    config: JobQueueConfig,
    is_running: Arc<tokio::sync::RwLock<bool>>,
    jobs_processed: AtomicU64,
    jobs_failed: AtomicU64,
}

impl BackgroundWorker {
    pub fn new(
        job_repository: Arc<dyn JobRepository>,
        translation_service: Arc<TranslationService>,
        config: JobQueueConfig,
    ) -> Self {
        Self {
            job_repository,
            translation_service,
            config,
            is_running: Arc::new(tokio::sync::RwLock::new(false)),
            jobs_processed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
        }
    }

    /// Worker loop; returns after [`BackgroundWorker::stop`]
    pub async fn run(self: Arc<Self>) {
        log_info!(
            "Background worker started (poll every {:?}, time limit {:?})",
            self.config.poll_interval,
            self.config.task_time_limit
        );

        *self.is_running.write().await = true;

        loop {
            if !*self.is_running.read().await {
                log_info!("Background worker stopped");
                break;
            }

            match self.process_next_job().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.config.poll_interval).await,
                Err(e) => {
                    log_error!("Error in worker loop: {}", e);
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    /// Queue a job, applying the configured attempt limit unless it sets one
    pub async fn enqueue(&self, job: Job) -> AppResult<JobRecord> {
        let job = match job.max_attempts {
            Some(_) => job,
            None => job.with_max_attempts(self.config.max_attempts),
        };
        let record = self.job_repository.enqueue(job).await?;
        log_debug!(
            "Enqueued job {} ({}, priority {})",
            record.id,
            record.job_type,
            record.priority
        );
        Ok(record)
    }

    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        log_info!("Background worker stop requested");
    }

    /// Claim and run one job; `false` when the queue was empty
    pub async fn process_next_job(&self) -> AppResult<bool> {
        let Some(job) = self.job_repository.dequeue().await? else {
            return Ok(false);
        };

        log_info!(
            "Processing job {} (type: {}, attempts: {}/{})",
            job.id,
            job.job_type,
            job.attempts,
            job.max_attempts
        );

        let progress = JobProgressReporter::new(Arc::clone(&self.job_repository), job.id);
        if self.config.track_started {
            progress.report(STARTED_PROGRESS).await;
        }

        let result = match tokio::time::timeout(
            self.config.task_time_limit,
            self.execute(&job, &progress),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                self.handle_timeout(&job).await;
                Err(AppError::Timeout(format!(
                    "Job exceeded time limit of {:?}",
                    self.config.task_time_limit
                )))
            }
        };

        self.jobs_processed.fetch_add(1, Ordering::Relaxed);

        match result {
            Ok(()) => {
                self.job_repository.mark_completed(job.id).await?;
                log_info!("Job {} completed successfully", job.id);
            }
            Err(e) => {
                self.jobs_failed.fetch_add(1, Ordering::Relaxed);
                let retryable = e.is_retryable();

                if retryable && job.can_retry() {
                    log_warn!(
                        "Job {} failed, will be retried (attempt {}/{}): {}",
                        job.id,
                        job.attempts,
                        job.max_attempts,
                        e
                    );
                } else {
                    log_error!(
                        "Job {} failed permanently after {} attempts: {}",
                        job.id,
                        job.attempts,
                        e
                    );
                }
                self.job_repository
                    .mark_failed(job.id, &e.to_string(), retryable)
                    .await?;
            }
        }

        Ok(true)
    }

    async fn execute(&self, job: &JobRecord, progress: &JobProgressReporter) -> AppResult<()> {
        let job_type = job
            .parse_job_type()
            .map_err(|e| AppError::ValidationError(format!("Invalid job type: {}", e)))?;

        match job_type {
            JobType::TranslateChapter => {
                let payload: TranslateChapterPayload = job.parse_payload()?;
                let task_id = job.id.to_string();
                let outcome = self
                    .translation_service
                    .translate_chapter(
                        &payload.user_id,
                        &payload.novel_slug,
                        payload.chapter_id,
                        payload.options(),
                        Some(&task_id),
                        progress,
                    )
                    .await?;
                log_debug!(
                    "Chapter {} finished as {}",
                    outcome.chapter_id,
                    outcome.status
                );
            }
            JobType::TranslateChapterTitle => {
                let payload: TranslateChapterTitlePayload = job.parse_payload()?;
                progress.report("Translating title...").await;
                self.translation_service
                    .translate_chapter_title(&payload.user_id, payload.chapter_id)
                    .await?;
            }
            JobType::TranslateNovelTitle => {
                let payload: TranslateNovelTitlePayload = job.parse_payload()?;
                let outcome = self
                    .translation_service
                    .translate_novel_title(&payload.user_id, &payload.novel_slug, progress)
                    .await?;
                log_debug!(
                    "Novel '{}' title translated as '{}'",
                    outcome.novel_slug,
                    outcome.translated_title
                );
            }
        }
        Ok(())
    }

    /// An abandoned chapter translation must not stay `in_progress`
    async fn handle_timeout(&self, job: &JobRecord) {
        log_warn!(
            "Job {} exceeded the {:?} time limit",
            job.id,
            self.config.task_time_limit
        );

        if job.parse_job_type() == Ok(JobType::TranslateChapter) {
            if let Ok(payload) = job.parse_payload::<TranslateChapterPayload>() {
                self.translation_service
                    .mark_failed(&payload.user_id, payload.chapter_id)
                    .await;
            }
        }
    }

    pub async fn get_statistics(&self) -> AppResult<WorkerStatistics> {
        let job_stats = self.job_repository.get_statistics().await?;

        Ok(WorkerStatistics {
            is_running: *self.is_running.read().await,
            jobs_processed: self.jobs_processed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            pending_jobs: job_stats.pending_count,
            running_jobs: job_stats.running_count,
            completed_jobs: job_stats.completed_count,
            failed_jobs: job_stats.failed_count,
            total_jobs: job_stats.total_count,
        })
    }
}

/// Worker and queue statistics for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatistics {
    pub is_running: bool,
    /// Jobs this worker ran since start
    pub jobs_processed: u64,
    pub jobs_failed: u64,
    pub pending_jobs: i64,
    pub running_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub total_jobs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::domain::entities::{JobStatus, PRIORITY_NORMAL};
    use crate::modules::jobs::infrastructure::InMemoryJobRepository;
    use crate::modules::novel::infrastructure::{InMemoryNovelRepository, MemoryDatabase};
    use crate::modules::translation::InMemoryTokenUsageRepository;
    use std::time::Duration;

    fn worker_without_translator(config: JobQueueConfig) -> (BackgroundWorker, Arc<InMemoryJobRepository>) {
        let db = MemoryDatabase::new();
        let service = TranslationService::new(
            Arc::new(InMemoryNovelRepository::new(Arc::clone(&db))),
            Arc::new(InMemoryTokenUsageRepository::new(db)),
            None,
            None,
        );
        let jobs = Arc::new(InMemoryJobRepository::new());
        let worker = BackgroundWorker::new(jobs.clone(), Arc::new(service), config);
        (worker, jobs)
    }

    #[tokio::test]
    async fn test_empty_queue_reports_no_work() {
        let (worker, _) = worker_without_translator(JobQueueConfig::default());
        assert!(!worker.process_next_job().await.unwrap());
    }

    #[tokio::test]
    async fn test_enqueue_applies_configured_attempts() {
        let config = JobQueueConfig {
            max_attempts: 7,
            ..JobQueueConfig::default()
        };
        let (worker, _) = worker_without_translator(config);

        let job = Job::translate_chapter_title("reader", 1, PRIORITY_NORMAL).unwrap();
        assert_eq!(worker.enqueue(job).await.unwrap().max_attempts, 7);

        let job = Job::translate_chapter_title("reader", 1, PRIORITY_NORMAL)
            .unwrap()
            .with_max_attempts(2);
        assert_eq!(worker.enqueue(job).await.unwrap().max_attempts, 2);
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_permanently() {
        let (worker, jobs) = worker_without_translator(JobQueueConfig::default());
        let job = Job::translate_chapter_title("reader", 99, PRIORITY_NORMAL).unwrap();
        let record = worker.enqueue(job).await.unwrap();

        assert!(worker.process_next_job().await.unwrap());

        let stored = jobs.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
        assert_eq!(stored.attempts, 1);
        assert!(stored.error.unwrap().contains("No API key configured"));

        let stats = worker.get_statistics().await.unwrap();
        assert_eq!(stats.jobs_processed, 1);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.failed_jobs, 1);
    }

    #[tokio::test]
    async fn test_progress_reporter_stores_message() {
        let jobs = Arc::new(InMemoryJobRepository::new());
        let record = jobs
            .enqueue(Job::translate_chapter_title("reader", 1, PRIORITY_NORMAL).unwrap())
            .await
            .unwrap();

        let reporter = JobProgressReporter::new(jobs.clone(), record.id);
        reporter.report("Translating title...").await;

        let stored = jobs.get_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(stored.progress.as_deref(), Some("Translating title..."));
    }

    #[tokio::test]
    async fn test_stop_ends_run_loop() {
        let config = JobQueueConfig {
            poll_interval: Duration::from_millis(10),
            ..JobQueueConfig::default()
        };
        let (worker, _) = worker_without_translator(config);
        let worker = Arc::new(worker);

        let handle = tokio::spawn(Arc::clone(&worker).run());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(worker.get_statistics().await.unwrap().is_running);

        worker.stop().await;
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker should stop")
            .unwrap();
    }
}
