/// Domain entities for the background job queue
///
/// Jobs carry translation work: a chapter, a chapter title, or a novel's
/// title and author. Payloads are JSON so the queue table stays generic.
use crate::modules::translation::TranslateChapterOptions;
use crate::shared::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dequeued first
pub const PRIORITY_HIGH: i32 = 1;
pub const PRIORITY_NORMAL: i32 = 5;
pub const PRIORITY_LOW: i32 = 10;

/// Error stored on jobs cancelled before they finished
pub const CANCELLED_ERROR: &str = "cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    TranslateChapter,
    TranslateChapterTitle,
    TranslateNovelTitle,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::TranslateChapter => write!(f, "translate_chapter"),
            JobType::TranslateChapterTitle => write!(f, "translate_chapter_title"),
            JobType::TranslateNovelTitle => write!(f, "translate_novel_title"),
        }
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "translate_chapter" => Ok(JobType::TranslateChapter),
            "translate_chapter_title" => Ok(JobType::TranslateChapterTitle),
            "translate_novel_title" => Ok(JobType::TranslateNovelTitle),
            _ => Err(format!("Invalid job type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateChapterPayload {
    pub user_id: String,
    pub novel_slug: String,
    pub chapter_id: i32,
    #[serde(default = "default_true")]
    pub translate_title: bool,
    #[serde(default = "default_true")]
    pub translate_content: bool,
}

impl TranslateChapterPayload {
    pub fn options(&self) -> TranslateChapterOptions {
        TranslateChapterOptions {
            translate_title: self.translate_title,
            translate_content: self.translate_content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateChapterTitlePayload {
    pub user_id: String,
    pub chapter_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateNovelTitlePayload {
    pub user_id: String,
    pub novel_slug: String,
}

fn default_true() -> bool {
    true
}

/// New job to be queued
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_type: JobType,
    pub payload: serde_json::Value,
    pub priority: i32,
    /// Table default when `None`
    pub max_attempts: Option<i32>,
}

impl Job {
    fn new<P: Serialize>(job_type: JobType, payload: &P, priority: i32) -> AppResult<Self> {
        Ok(Self {
            job_type,
            payload: serde_json::to_value(payload)?,
            priority,
            max_attempts: None,
        })
    }

    pub fn translate_chapter(
        user_id: &str,
        novel_slug: &str,
        chapter_id: i32,
        options: TranslateChapterOptions,
        priority: i32,
    ) -> AppResult<Self> {
        let payload = TranslateChapterPayload {
            user_id: user_id.to_string(),
            novel_slug: novel_slug.to_string(),
            chapter_id,
            translate_title: options.translate_title,
            translate_content: options.translate_content,
        };
        Self::new(JobType::TranslateChapter, &payload, priority)
    }

    pub fn translate_chapter_title(user_id: &str, chapter_id: i32, priority: i32) -> AppResult<Self> {
        let payload = TranslateChapterTitlePayload {
            user_id: user_id.to_string(),
            chapter_id,
        };
        Self::new(JobType::TranslateChapterTitle, &payload, priority)
    }

    pub fn translate_novel_title(user_id: &str, novel_slug: &str, priority: i32) -> AppResult<Self> {
        let payload = TranslateNovelTitlePayload {
            user_id: user_id.to_string(),
            novel_slug: novel_slug.to_string(),
        };
        Self::new(JobType::TranslateNovelTitle, &payload, priority)
    }

    pub fn with_max_attempts(mut self, max_attempts: i32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }
}

/// Job record from the queue table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub job_type: String,
    pub payload: serde_json::Value,
    pub priority: i32,
    pub status: JobStatus,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Last progress message of a running job
    pub progress: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn parse_job_type(&self) -> Result<JobType, String> {
        self.job_type.parse()
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn parse_payload<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.payload.clone()).map_err(|e| {
            AppError::ValidationError(format!("Invalid {} payload: {}", self.job_type, e))
        })
    }

    /// Chapter the job works on, if any
    pub fn chapter_id(&self) -> Option<i32> {
        self.payload
            .get("chapter_id")
            .and_then(|v| v.as_i64())
            .and_then(|v| i32::try_from(v).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(job: &Job) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            job_type: job.job_type.to_string(),
            payload: job.payload.clone(),
            priority: job.priority,
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts: 3,
            progress: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("pending".parse::<JobStatus>().unwrap(), JobStatus::Pending);
        assert_eq!("RUNNING".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert!("invalid".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_type_round_trip() {
        for job_type in [
            JobType::TranslateChapter,
            JobType::TranslateChapterTitle,
            JobType::TranslateNovelTitle,
        ] {
            assert_eq!(job_type.to_string().parse::<JobType>(), Ok(job_type));
        }
        assert!("enrichment".parse::<JobType>().is_err());
    }

    #[test]
    fn test_translate_chapter_payload() {
        let options = TranslateChapterOptions {
            translate_title: false,
            translate_content: true,
        };
        let job = Job::translate_chapter("reader", "orv", 42, options, PRIORITY_HIGH).unwrap();

        assert_eq!(job.job_type, JobType::TranslateChapter);
        assert_eq!(job.priority, PRIORITY_HIGH);

        let record = record(&job);
        let payload: TranslateChapterPayload = record.parse_payload().unwrap();
        assert_eq!(payload.chapter_id, 42);
        assert_eq!(payload.options(), options);
        assert_eq!(record.chapter_id(), Some(42));
    }

    #[test]
    fn test_missing_flags_default_to_true() {
        let payload: TranslateChapterPayload = serde_json::from_value(serde_json::json!({
            "user_id": "reader",
            "novel_slug": "orv",
            "chapter_id": 1
        }))
        .unwrap();
        assert_eq!(payload.options(), TranslateChapterOptions::default());
    }

    #[test]
    fn test_novel_title_job_has_no_chapter() {
        let job = Job::translate_novel_title("reader", "orv", PRIORITY_LOW).unwrap();
        assert_eq!(record(&job).chapter_id(), None);
    }

    #[test]
    fn test_can_retry() {
        let job = Job::translate_chapter_title("reader", 1, PRIORITY_NORMAL).unwrap();
        let mut record = record(&job);
        record.attempts = 2;
        assert!(record.can_retry());
        record.attempts = 3;
        assert!(!record.can_retry());
    }

    #[test]
    fn test_bad_payload_is_validation_error() {
        let job = Job::translate_novel_title("reader", "orv", PRIORITY_LOW).unwrap();
        let err = record(&job)
            .parse_payload::<TranslateChapterPayload>()
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
