pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{
    Job, JobRecord, JobStatus, JobType, TranslateChapterPayload, TranslateChapterTitlePayload,
    TranslateNovelTitlePayload, CANCELLED_ERROR, PRIORITY_HIGH, PRIORITY_LOW, PRIORITY_NORMAL,
};
pub use repository::{JobRepository, JobStatistics};
pub use value_objects::JobStatusDb;
