pub mod service;
pub mod use_cases;

pub use service::{ChapterOrderDiagnosis, ChapterOrderEntry, NovelService};
pub use use_cases::{AddChapterCommand, AddChapterHandler, InsertChapterResult};
