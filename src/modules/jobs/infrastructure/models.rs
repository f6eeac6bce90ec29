/// Diesel models for the background_jobs table
use crate::modules::jobs::domain::entities::{Job, JobRecord};
use crate::modules::jobs::domain::value_objects::JobStatusDb;
use crate::schema::background_jobs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Insertable, Debug)]
#[diesel(table_name = background_jobs)]
pub struct NewJob {
    pub job_type: String,
    pub payload: JsonValue,
    pub priority: i32,
    pub max_attempts: Option<i32>,
}

impl From<Job> for NewJob {
    fn from(job: Job) -> Self {
        Self {
            job_type: job.job_type.to_string(),
            payload: job.payload,
            priority: job.priority,
            max_attempts: job.max_attempts,
        }
    }
}

/// Row as returned by both the query builder and the raw dequeue statement
#[derive(Queryable, Selectable, QueryableByName, Debug, Clone)]
#[diesel(table_name = background_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BackgroundJobModel {
    pub id: Uuid,
    pub job_type: String,
    pub payload: JsonValue,
    pub priority: i32,
    pub status: JobStatusDb,
    pub attempts: i32,
    pub max_attempts: i32,
    pub progress: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl From<BackgroundJobModel> for JobRecord {
    fn from(model: BackgroundJobModel) -> Self {
        Self {
            id: model.id,
            job_type: model.job_type,
            payload: model.payload,
            priority: model.priority,
            status: model.status.into(),
            attempts: model.attempts,
            max_attempts: model.max_attempts,
            progress: model.progress,
            created_at: model.created_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            error: model.error,
        }
    }
}
