/// Diesel implementation of [`JobRepository`]
///
/// Dequeue claims rows with `SELECT ... FOR UPDATE SKIP LOCKED`, so any number
/// of workers can share the table.
use crate::modules::jobs::domain::entities::{Job, JobRecord, CANCELLED_ERROR};
use crate::modules::jobs::domain::repository::{JobRepository, JobStatistics};
use crate::modules::jobs::domain::value_objects::JobStatusDb;
use crate::modules::jobs::infrastructure::models::{BackgroundJobModel, NewJob};
use crate::schema::background_jobs;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::Database;
use async_trait::async_trait;
use diesel::dsl::count_star;
use diesel::prelude::*;
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

pub struct JobRepositoryImpl {
    db: Arc<Database>,
}

impl JobRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, context: &'static str, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> QueryResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> AppResult<T> {
            let mut conn = db.get_connection()?;
            f(&mut conn).map_err(|e| AppError::DatabaseError(format!("{}: {}", context, e)))
        })
        .await?
    }
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn enqueue(&self, job: Job) -> AppResult<JobRecord> {
        let new_job = NewJob::from(job);

        let inserted = self
            .run("Failed to enqueue job", move |conn| {
                diesel::insert_into(background_jobs::table)
                    .values(&new_job)
                    .returning(BackgroundJobModel::as_returning())
                    .get_result(conn)
            })
            .await?;

        Ok(inserted.into())
    }

    async fn dequeue(&self) -> AppResult<Option<JobRecord>> {
        let claimed: Option<BackgroundJobModel> = self
            .run("Failed to dequeue job", |conn| {
                diesel::sql_query(
                    r#"
                    UPDATE background_jobs
                    SET status = 'running',
                        started_at = NOW(),
                        progress = NULL,
                        attempts = attempts + 1
                    WHERE id = (
                        SELECT id
                        FROM background_jobs
                        WHERE status = 'pending'
                          AND attempts < max_attempts
                        ORDER BY priority ASC, created_at ASC
                        LIMIT 1
                        FOR UPDATE SKIP LOCKED
                    )
                    RETURNING id, job_type, payload, priority, status,
                              attempts, max_attempts, progress, created_at,
                              started_at, completed_at, error
                    "#,
                )
                .get_result(conn)
                .optional()
            })
            .await?;

        Ok(claimed.map(JobRecord::from))
    }

    async fn mark_completed(&self, job_id: Uuid) -> AppResult<()> {
        self.run("Failed to mark job as completed", move |conn| {
            diesel::sql_query(
                "UPDATE background_jobs
                 SET status = 'completed', completed_at = NOW(), error = NULL
                 WHERE id = $1",
            )
            .bind::<diesel::sql_types::Uuid, _>(job_id)
            .execute(conn)
        })
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str, retryable: bool) -> AppResult<()> {
        let error = error.to_string();

        self.run("Failed to mark job as failed", move |conn| {
            diesel::sql_query(
                "UPDATE background_jobs
                 SET status = CASE
                     WHEN $3 AND attempts < max_attempts THEN 'pending'::job_status
                     ELSE 'failed'::job_status
                 END,
                 completed_at = CASE
                     WHEN $3 AND attempts < max_attempts THEN NULL
                     ELSE NOW()
                 END,
                 started_at = NULL,
                 error = $2
                 WHERE id = $1",
            )
            .bind::<diesel::sql_types::Uuid, _>(job_id)
            .bind::<diesel::sql_types::Text, _>(error)
            .bind::<diesel::sql_types::Bool, _>(retryable)
            .execute(conn)
        })
        .await?;
        Ok(())
    }

    async fn update_progress(&self, job_id: Uuid, progress: &str) -> AppResult<()> {
        let progress = progress.to_string();

        self.run("Failed to update job progress", move |conn| {
            diesel::update(background_jobs::table.find(job_id))
                .set(background_jobs::progress.eq(Some(progress)))
                .execute(conn)
        })
        .await?;
        Ok(())
    }

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        let job = self
            .run("Failed to get job by id", move |conn| {
                background_jobs::table
                    .find(job_id)
                    .select(BackgroundJobModel::as_select())
                    .first(conn)
                    .optional()
            })
            .await?;

        Ok(job.map(JobRecord::from))
    }

    async fn get_pending_jobs(&self) -> AppResult<Vec<JobRecord>> {
        let jobs = self
            .run("Failed to get pending jobs", |conn| {
                background_jobs::table
                    .filter(background_jobs::status.eq(JobStatusDb::Pending))
                    .order((
                        background_jobs::priority.asc(),
                        background_jobs::created_at.asc(),
                    ))
                    .select(BackgroundJobModel::as_select())
                    .load(conn)
            })
            .await?;

        Ok(jobs.into_iter().map(JobRecord::from).collect())
    }

    async fn get_jobs_for_chapter(&self, chapter_id: i32) -> AppResult<Vec<JobRecord>> {
        let jobs: Vec<BackgroundJobModel> = self
            .run("Failed to get jobs for chapter", move |conn| {
                diesel::sql_query(
                    "SELECT id, job_type, payload, priority, status,
                            attempts, max_attempts, progress, created_at,
                            started_at, completed_at, error
                     FROM background_jobs
                     WHERE payload->>'chapter_id' = $1
                     ORDER BY created_at DESC",
                )
                .bind::<diesel::sql_types::Text, _>(chapter_id.to_string())
                .load(conn)
            })
            .await?;

        Ok(jobs.into_iter().map(JobRecord::from).collect())
    }

    async fn cancel(&self, job_id: Uuid) -> AppResult<bool> {
        let updated = self
            .run("Failed to cancel job", move |conn| {
                diesel::sql_query(
                    "UPDATE background_jobs
                     SET status = 'failed', error = $2, completed_at = NOW()
                     WHERE id = $1 AND status IN ('pending', 'running')",
                )
                .bind::<diesel::sql_types::Uuid, _>(job_id)
                .bind::<diesel::sql_types::Text, _>(CANCELLED_ERROR)
                .execute(conn)
            })
            .await?;

        Ok(updated > 0)
    }

    async fn purge_pending(&self) -> AppResult<usize> {
        self.run("Failed to purge pending jobs", |conn| {
            diesel::delete(
                background_jobs::table.filter(background_jobs::status.eq(JobStatusDb::Pending)),
            )
            .execute(conn)
        })
        .await
    }

    async fn delete_old_completed(&self, days: i32) -> AppResult<usize> {
        self.run("Failed to delete old jobs", move |conn| {
            diesel::sql_query(
                "DELETE FROM background_jobs
                 WHERE status IN ('completed', 'failed')
                 AND completed_at < NOW() - INTERVAL '1 day' * $1",
            )
            .bind::<diesel::sql_types::Integer, _>(days)
            .execute(conn)
        })
        .await
    }

    async fn get_statistics(&self) -> AppResult<JobStatistics> {
        let counts: Vec<(JobStatusDb, i64)> = self
            .run("Failed to count jobs", |conn| {
                background_jobs::table
                    .group_by(background_jobs::status)
                    .select((background_jobs::status, count_star()))
                    .load(conn)
            })
            .await?;

        let mut stats = JobStatistics::default();
        for (status, count) in counts {
            match status {
                JobStatusDb::Pending => stats.pending_count = count,
                JobStatusDb::Running => stats.running_count = count,
                JobStatusDb::Completed => stats.completed_count = count,
                JobStatusDb::Failed => stats.failed_count = count,
            }
            stats.total_count += count;
        }
        Ok(stats)
    }
}
