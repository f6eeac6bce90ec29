use super::use_cases::{AddChapterCommand, AddChapterHandler, InsertChapterResult};
use crate::modules::novel::domain::{
    entities::{Chapter, ChapterChanges, NewChapter, NewNovel, Novel, NovelChanges},
    repositories::NovelRepository,
    services::OrderReport,
};
use crate::shared::application::UseCase;
use crate::shared::errors::{AppError, AppResult};
use crate::log_info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DIAGNOSIS_TITLE_LIMIT: usize = 50;

/// One line of a chapter order diagnosis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOrderEntry {
    pub position: i32,
    pub chapter_id: i32,
    pub episode_id: Option<i64>,
    /// `"N/A"` when the chapter has no number
    pub chapter_number: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterOrderDiagnosis {
    pub novel_slug: String,
    pub report: OrderReport,
    pub entries: Vec<ChapterOrderEntry>,
}

/// Entry point for novel and chapter management
pub struct NovelService {
    novel_repo: Arc<dyn NovelRepository>,
    add_chapter: AddChapterHandler,
}

impl NovelService {
    pub fn new(novel_repo: Arc<dyn NovelRepository>) -> Self {
        Self {
            add_chapter: AddChapterHandler::new(Arc::clone(&novel_repo)),
            novel_repo,
        }
    }

    pub async fn create_novel(&self, user_id: &str, novel: &NewNovel) -> AppResult<Novel> {
        if novel.slug.trim().is_empty() {
            return Err(AppError::InvalidInput("Novel slug cannot be empty".into()));
        }
        let created = self.novel_repo.create_novel(user_id, novel).await?;
        log_info!("Created novel '{}' for user {}", created.slug, user_id);
        Ok(created)
    }

    pub async fn get_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<Novel> {
        self.novel_repo
            .get_novel(user_id, novel_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))
    }

    pub async fn list_novels(&self, user_id: &str) -> AppResult<Vec<Novel>> {
        self.novel_repo.list_user_novels(user_id).await
    }

    pub async fn update_novel(
        &self,
        user_id: &str,
        novel_slug: &str,
        changes: &NovelChanges,
    ) -> AppResult<Novel> {
        if changes.is_empty() {
            return self.get_novel(user_id, novel_slug).await;
        }
        self.novel_repo.update_novel(user_id, novel_slug, changes).await
    }

    pub async fn delete_novel(&self, user_id: &str, novel_slug: &str) -> AppResult<bool> {
        self.novel_repo.delete_novel(user_id, novel_slug).await
    }

    pub async fn find_novel_by_source_url(
        &self,
        user_id: &str,
        source_url: &str,
    ) -> AppResult<Option<Novel>> {
        self.novel_repo
            .find_novel_by_source_url(user_id, source_url)
            .await
    }

    pub async fn find_novel_by_title(&self, user_id: &str, title: &str) -> AppResult<Option<Novel>> {
        self.novel_repo.find_novel_by_title(user_id, title).await
    }

    pub async fn next_chapter_position(&self, user_id: &str, novel_slug: &str) -> AppResult<i32> {
        self.novel_repo
            .get_next_chapter_position(user_id, novel_slug)
            .await
    }

    /// Import a chapter at its ordered position
    pub async fn add_chapter(
        &self,
        user_id: &str,
        novel_slug: &str,
        chapter: NewChapter,
    ) -> AppResult<InsertChapterResult> {
        self.add_chapter
            .execute(AddChapterCommand::new(user_id, novel_slug, chapter))
            .await
    }

    pub async fn list_chapters(&self, user_id: &str, novel_slug: &str) -> AppResult<Vec<Chapter>> {
        self.novel_repo.list_chapters(user_id, novel_slug).await
    }

    pub async fn get_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<Chapter> {
        self.novel_repo
            .get_chapter(user_id, chapter_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chapter {} not found", chapter_id)))
    }

    pub async fn update_chapter(
        &self,
        user_id: &str,
        chapter_id: i32,
        changes: &ChapterChanges,
    ) -> AppResult<Chapter> {
        self.novel_repo
            .update_chapter(user_id, chapter_id, changes)
            .await
    }

    pub async fn delete_chapter(&self, user_id: &str, chapter_id: i32) -> AppResult<bool> {
        self.novel_repo.delete_chapter(user_id, chapter_id).await
    }

    /// Per-chapter listing of the order keys plus the consistency report
    pub async fn diagnose_chapter_order(
        &self,
        user_id: &str,
        novel_slug: &str,
    ) -> AppResult<ChapterOrderDiagnosis> {
        let report = self
            .novel_repo
            .diagnose_chapter_order(user_id, novel_slug)
            .await?;
        let chapters = self.novel_repo.list_chapters(user_id, novel_slug).await?;

        let entries = chapters
            .iter()
            .map(|c| ChapterOrderEntry {
                position: c.position,
                chapter_id: c.id,
                episode_id: c.episode_id(),
                chapter_number: c
                    .chapter_number
                    .clone()
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "N/A".to_string()),
                title: shorten_title(&c.title),
            })
            .collect();

        Ok(ChapterOrderDiagnosis {
            novel_slug: novel_slug.to_string(),
            report,
            entries,
        })
    }
}

fn shorten_title(title: &str) -> String {
    if title.chars().count() > DIAGNOSIS_TITLE_LIMIT {
        let head: String = title.chars().take(DIAGNOSIS_TITLE_LIMIT - 3).collect();
        format!("{}...", head)
    } else {
        title.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::novel::infrastructure::{InMemoryNovelRepository, MemoryDatabase};

    #[test]
    fn test_shorten_title() {
        assert_eq!(shorten_title("Short"), "Short");
        let long = "가".repeat(60);
        let short = shorten_title(&long);
        assert_eq!(short.chars().count(), 50);
        assert!(short.ends_with("..."));
    }

    #[tokio::test]
    async fn test_diagnosis_lists_chapters_in_order() {
        let service = NovelService::new(Arc::new(InMemoryNovelRepository::new(
            MemoryDatabase::new(),
        )));
        service
            .create_novel("reader", &NewNovel::new("orv", "ORV"))
            .await
            .unwrap();
        service
            .add_chapter(
                "reader",
                "orv",
                NewChapter::new("b").with_source_url("https://x.example/viewer/20"),
            )
            .await
            .unwrap();
        service
            .add_chapter(
                "reader",
                "orv",
                NewChapter::new("a").with_source_url("https://x.example/viewer/10"),
            )
            .await
            .unwrap();

        let diagnosis = service.diagnose_chapter_order("reader", "orv").await.unwrap();
        assert!(diagnosis.report.is_consistent());
        let episodes: Vec<_> = diagnosis.entries.iter().map(|e| e.episode_id).collect();
        assert_eq!(episodes, vec![Some(10), Some(20)]);
        assert_eq!(diagnosis.entries[0].chapter_number, "N/A");
    }

    #[tokio::test]
    async fn test_missing_chapter_is_not_found() {
        let service = NovelService::new(Arc::new(InMemoryNovelRepository::new(
            MemoryDatabase::new(),
        )));
        assert!(matches!(
            service.get_chapter("reader", 42).await,
            Err(AppError::NotFound(_))
        ));
    }
}
