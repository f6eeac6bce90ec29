use crate::modules::novel::domain::services::ChapterInsertOutcome;
use serde::{Deserialize, Serialize};

pub const IMPORTED_MESSAGE: &str = "Chapter imported successfully";
pub const SKIPPED_MESSAGE: &str = "Chapter already exists - skipped";

/// Result of importing a chapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertChapterResult {
    pub success: bool,
    /// true if the source url was already imported and nothing was written
    pub already_exists: bool,
    pub novel_slug: String,
    pub chapter_position: i32,
    pub chapter_id: i32,
    pub message: String,
}

impl From<ChapterInsertOutcome> for InsertChapterResult {
    fn from(outcome: ChapterInsertOutcome) -> Self {
        let message = if outcome.already_exists {
            SKIPPED_MESSAGE
        } else {
            IMPORTED_MESSAGE
        };

        Self {
            success: true,
            already_exists: outcome.already_exists,
            novel_slug: outcome.novel_slug,
            chapter_position: outcome.position,
            chapter_id: outcome.chapter_id,
            message: message.to_string(),
        }
    }
}
