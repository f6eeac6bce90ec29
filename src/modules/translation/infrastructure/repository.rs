use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::{count_star, sum};
use diesel::prelude::*;
use tokio::task;

use super::models::{NewTokenUsageRow, TokenUsageRow};
use crate::modules::translation::domain::{
    NewTokenUsage, ProviderUsage, TokenUsage, TokenUsageRepository, UsageSummary, UsageWindow,
};
use crate::schema::{chapters, translation_token_usage};
use crate::shared::errors::AppResult;
use crate::shared::Database;
use crate::log_debug;

type SummaryRow = (Option<i64>, Option<i64>, Option<i64>, i64);

fn to_summary((input, output, total, count): SummaryRow) -> UsageSummary {
    UsageSummary {
        total_input_tokens: input.unwrap_or(0),
        total_output_tokens: output.unwrap_or(0),
        total_tokens: total.unwrap_or(0),
        record_count: count,
    }
}

pub struct TokenUsageRepositoryImpl {
    db: Arc<Database>,
}

impl TokenUsageRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn load_window(&self, user_id: &str, window: UsageWindow) -> AppResult<Vec<TokenUsage>> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        let rows = task::spawn_blocking(move || -> AppResult<Vec<TokenUsageRow>> {
            let mut conn = db.get_connection()?;
            let mut query = translation_token_usage::table
                .filter(translation_token_usage::user_id.eq(&user_id))
                .into_boxed();
            if let Some(start) = window.start {
                query = query.filter(translation_token_usage::created_at.ge(start));
            }
            if let Some(end) = window.end {
                query = query.filter(translation_token_usage::created_at.le(end));
            }
            Ok(query
                .select(TokenUsageRow::as_select())
                .load(&mut conn)?)
        })
        .await??;

        Ok(rows.into_iter().map(TokenUsage::from).collect())
    }
}

#[async_trait]
impl TokenUsageRepository for TokenUsageRepositoryImpl {
    async fn save(&self, usage: &NewTokenUsage) -> AppResult<TokenUsage> {
        let db = Arc::clone(&self.db);
        let row = NewTokenUsageRow::from(usage);

        let saved = task::spawn_blocking(move || -> AppResult<TokenUsageRow> {
            let mut conn = db.get_connection()?;
            Ok(diesel::insert_into(translation_token_usage::table)
                .values(&row)
                .returning(TokenUsageRow::as_returning())
                .get_result(&mut conn)?)
        })
        .await??;

        log_debug!(
            "Recorded {} tokens ({}) for chapter {}",
            saved.total_tokens,
            saved.translation_type,
            saved.chapter_id
        );
        Ok(saved.into())
    }

    async fn list_for_chapter(&self, chapter_id: i32) -> AppResult<Vec<TokenUsage>> {
        let db = Arc::clone(&self.db);

        let rows = task::spawn_blocking(move || -> AppResult<Vec<TokenUsageRow>> {
            let mut conn = db.get_connection()?;
            Ok(translation_token_usage::table
                .filter(translation_token_usage::chapter_id.eq(chapter_id))
                .order((
                    translation_token_usage::created_at.desc(),
                    translation_token_usage::id.desc(),
                ))
                .select(TokenUsageRow::as_select())
                .load(&mut conn)?)
        })
        .await??;

        Ok(rows.into_iter().map(TokenUsage::from).collect())
    }

    async fn summary_for_novel(&self, user_id: &str, novel_id: i32) -> AppResult<UsageSummary> {
        let db = Arc::clone(&self.db);
        let user_id = user_id.to_string();

        let row = task::spawn_blocking(move || -> AppResult<SummaryRow> {
            let mut conn = db.get_connection()?;
            Ok(translation_token_usage::table
                .inner_join(chapters::table)
                .filter(chapters::novel_id.eq(novel_id))
                .filter(translation_token_usage::user_id.eq(&user_id))
                .select((
                    sum(translation_token_usage::input_tokens),
                    sum(translation_token_usage::output_tokens),
                    sum(translation_token_usage::total_tokens),
                    count_star(),
                ))
                .first(&mut conn)?)
        })
        .await??;

        Ok(to_summary(row))
    }

    async fn summary_for_user(&self, user_id: &str, window: UsageWindow) -> AppResult<UsageSummary> {
        let records = self.load_window(user_id, window).await?;
        Ok(UsageSummary::from_records(&records))
    }

    async fn summary_by_provider(
        &self,
        user_id: &str,
        window: UsageWindow,
    ) -> AppResult<Vec<ProviderUsage>> {
        let records = self.load_window(user_id, window).await?;

        let mut by_provider: BTreeMap<String, UsageSummary> = BTreeMap::new();
        for record in &records {
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
        let db = Arc::clone(&self.db);
        let owner = user_id.to_string();

        let deleted = task::spawn_blocking(move || -> AppResult<usize> {
            let mut conn = db.get_connection()?;
            Ok(diesel::delete(
                translation_token_usage::table
                    .filter(translation_token_usage::user_id.eq(&owner)),
            )
            .execute(&mut conn)?)
        })
        .await??;

        log_debug!("Cleared {} token usage records for {}", deleted, user_id);
        Ok(deleted)
    }
}
