use async_trait::async_trait;
use std::sync::Arc;

use crate::modules::novel::domain::repositories::NovelRepository;
use crate::shared::{
    application::use_case::UseCase,
    errors::{AppError, AppResult},
};

use super::{command::AddChapterCommand, result::InsertChapterResult};

/// Use case handler for importing a chapter at its ordered position
pub struct AddChapterHandler {
    novel_repository: Arc<dyn NovelRepository>,
}

impl AddChapterHandler {
    pub fn new(novel_repository: Arc<dyn NovelRepository>) -> Self {
        Self { novel_repository }
    }
}

#[async_trait]
impl UseCase<AddChapterCommand, InsertChapterResult> for AddChapterHandler {
    async fn execute(&self, command: AddChapterCommand) -> AppResult<InsertChapterResult> {
        if command.chapter.slug.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Chapter slug cannot be empty".to_string(),
            ));
        }

        let outcome = self
            .novel_repository
            .add_chapter_atomic(&command.user_id, &command.novel_slug, &command.chapter)
            .await?;

        Ok(outcome.into())
    }
}
