/// Background job system
///
/// A PostgreSQL-backed queue for translation work: whole chapters, chapter
/// titles, and novel titles. Workers claim jobs atomically, so several can
/// share one table.
pub mod domain;
pub mod infrastructure;
pub mod worker;

pub use domain::{
    Job, JobRecord, JobRepository, JobStatistics, JobStatus, JobType, TranslateChapterPayload,
    TranslateChapterTitlePayload, TranslateNovelTitlePayload, PRIORITY_HIGH, PRIORITY_LOW,
    PRIORITY_NORMAL,
};
pub use infrastructure::{InMemoryJobRepository, JobRepositoryImpl};
pub use worker::{BackgroundWorker, JobProgressReporter, WorkerStatistics};
