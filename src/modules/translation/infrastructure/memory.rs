use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::modules::novel::infrastructure::MemoryDatabase;
use crate::modules::translation::domain::{
    NewTokenUsage, ProviderUsage, TokenUsage, TokenUsageRepository, UsageSummary, UsageWindow,
};
use crate::shared::errors::{AppError, AppResult};

/// Token usage kept in the [`MemoryDatabase`] next to the chapters it belongs to
pub struct InMemoryTokenUsageRepository {
    db: Arc<MemoryDatabase>,
}

impl InMemoryTokenUsageRepository {
    pub fn new(db: Arc<MemoryDatabase>) -> Self {
        Self { db }
    }

    fn window(&self, user_id: &str, window: UsageWindow) -> AppResult<Vec<TokenUsage>> {
        Ok(self
            .db
            .tables()?
            .token_usage
            .iter()
            .filter(|u| u.user_id == user_id && window.contains(u.created_at))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TokenUsageRepository for InMemoryTokenUsageRepository {
    async fn save(&self, usage: &NewTokenUsage) -> AppResult<TokenUsage> {
        let mut tables = self.db.tables()?;
        if !tables.chapters.contains_key(&usage.chapter_id) {
            return Err(AppError::DatabaseError(format!(
                "insert on \"translation_token_usage\" violates foreign key: chapter {} does not exist",
                usage.chapter_id
            )));
        }

        let record = TokenUsage {
            id: self.db.next_usage_id(),
            user_id: usage.user_id.clone(),
            chapter_id: usage.chapter_id,
            provider: usage.provider.clone(),
            model: usage.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            translation_type: usage.translation_type,
            created_at: Utc::now(),
        };
        tables.token_usage.push(record.clone());
        Ok(record)
    }

    async fn list_for_chapter(&self, chapter_id: i32) -> AppResult<Vec<TokenUsage>> {
        let mut records: Vec<_> = self
            .db
            .tables()?
            .token_usage
            .iter()
            .filter(|u| u.chapter_id == chapter_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn summary_for_novel(&self, user_id: &str, novel_id: i32) -> AppResult<UsageSummary> {
        let tables = self.db.tables()?;
        Ok(UsageSummary::from_records(tables.token_usage.iter().filter(|u| {
            u.user_id == user_id
                && tables
                    .chapters
                    .get(&u.chapter_id)
                    .is_some_and(|c| c.novel_id == novel_id)
        })))
    }

    async fn summary_for_user(&self, user_id: &str, window: UsageWindow) -> AppResult<UsageSummary> {
        Ok(UsageSummary::from_records(&self.window(user_id, window)?))
    }

    async fn summary_by_provider(
        &self,
        user_id: &str,
        window: UsageWindow,
    ) -> AppResult<Vec<ProviderUsage>> {
        let mut by_provider: BTreeMap<String, UsageSummary> = BTreeMap::new();
        for record in &self.window(user_id, window)? {
            by_provider
                .entry(record.provider.clone())
                .or_default()
                .add(record);
        }

        Ok(by_provider
            .into_iter()
            .map(|(provider, summary)| ProviderUsage { provider, summary })
            .collect())
    }

    async fn clear_for_user(&self, user_id: &str) -> AppResult<usize> {
        let mut tables = self.db.tables()?;
        let before = tables.token_usage.len();
        tables.token_usage.retain(|u| u.user_id != user_id);
        Ok(before - tables.token_usage.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::novel::domain::{entities::{NewChapter, NewNovel}, repositories::NovelRepository};
    use crate::modules::novel::infrastructure::InMemoryNovelRepository;
    use crate::modules::translation::domain::TranslationKind;

    fn usage(chapter_id: i32, provider: &str, total: i32, kind: TranslationKind) -> NewTokenUsage {
        NewTokenUsage {
            user_id: "reader".into(),
            chapter_id,
            provider: provider.into(),
            model: "m".into(),
            input_tokens: total / 2,
            output_tokens: total - total / 2,
            total_tokens: total,
            translation_type: kind,
        }
    }

    async fn seeded() -> (Arc<MemoryDatabase>, i32, i32) {
        let db = MemoryDatabase::new();
        let novels = InMemoryNovelRepository::new(Arc::clone(&db));
        let novel = novels
            .create_novel("reader", &NewNovel::new("orv", "ORV"))
            .await
            .unwrap();
        let chapter = novels
            .add_chapter_atomic("reader", "orv", &NewChapter::new("c1"))
            .await
            .unwrap();
        (db, novel.id, chapter.chapter_id)
    }

    #[tokio::test]
    async fn test_summaries() {
        let (db, novel_id, chapter_id) = seeded().await;
        let repo = InMemoryTokenUsageRepository::new(db);

        repo.save(&usage(chapter_id, "openai", 100, TranslationKind::Title))
            .await
            .unwrap();
        repo.save(&usage(chapter_id, "google", 50, TranslationKind::Content))
            .await
            .unwrap();
        repo.save(&usage(chapter_id, "openai", 10, TranslationKind::Content))
            .await
            .unwrap();

        let novel = repo.summary_for_novel("reader", novel_id).await.unwrap();
        assert_eq!(novel.total_tokens, 160);
        assert_eq!(novel.record_count, 3);

        let providers = repo
            .summary_by_provider("reader", UsageWindow::all())
            .await
            .unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.provider.as_str()).collect();
        assert_eq!(names, vec!["google", "openai"]);
        assert_eq!(providers[1].summary.total_tokens, 110);

        let listed = repo.list_for_chapter(chapter_id).await.unwrap();
        assert_eq!(listed[0].total_tokens, 10);

        assert_eq!(repo.clear_for_user("reader").await.unwrap(), 3);
        assert_eq!(
            repo.summary_for_user("reader", UsageWindow::all())
                .await
                .unwrap(),
            UsageSummary::default()
        );
    }

    #[tokio::test]
    async fn test_usage_for_missing_chapter_is_rejected() {
        let repo = InMemoryTokenUsageRepository::new(MemoryDatabase::new());
        let err = repo
            .save(&usage(99, "openai", 1, TranslationKind::Title))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
