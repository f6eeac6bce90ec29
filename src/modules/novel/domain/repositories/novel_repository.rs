use crate::modules::novel::domain::entities::{
    Chapter, ChapterChanges, NewChapter, NewNovel, Novel, NovelChanges,
};
use crate::modules::novel::domain::services::{ChapterInsertOutcome, OrderReport};
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Persistence of novels and their ordered chapters, scoped to the owning user
#[async_trait]
pub trait NovelRepository: Send + Sync {
    /// Fails with `ValidationError` when the owner already has the slug
    async fn create_novel(&self, user_id: &str, novel: &NewNovel) -> AppResult<Novel>;
    async fn get_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<Option<Novel>>;
    /// Newest first
    async fn list_user_novels(&self, user_id: &str) -> AppResult<Vec<Novel>>;
    async fn update_novel(
        &self,
        user_id: &str,
        novel_slug: &str,
        changes: &NovelChanges,
    ) -> AppResult<Novel>;
    /// Deletes chapters and token usage with the novel
    async fn delete_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<bool>;
    async fn find_novel_by_source_url(
        &self,
        user_id: &str,
        source_url: &str,
    ) -> AppResult<Option<Novel>>;
    /// Matches the title, original title or translated title
    async fn find_novel_by_title(&self, user_id: &str, title: &str) -> AppResult<Option<Novel>>;

    /// Position an appended chapter would get
    async fn get_next_chapter_position(&self, user_id: &str, novel_slug: &str) -> AppResult<i32>;

    /// Insert a chapter at its ordered position in one transaction
    async fn add_chapter_atomic(
        &self,
        user_id: &str,
        novel_slug: &str,
        chapter: &NewChapter,
    ) -> AppResult<ChapterInsertOutcome>;

    async fn list_chapters(&self, user_id: &str, novel_slug: &str) -> AppResult<Vec<Chapter>>;
    async fn get_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<Option<Chapter>>;
    async fn update_chapter(
        &self,
        user_id: &str,
        chapter_id: i32,
        changes: &ChapterChanges,
    ) -> AppResult<Chapter>;
    /// Closes the gap the chapter leaves in the position sequence
    async fn delete_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<bool>;

    async fn diagnose_chapter_order(
        &self,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<OrderReport>;
}
