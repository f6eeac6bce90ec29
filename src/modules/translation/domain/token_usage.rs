use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which part of a chapter a translation call covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationKind {
    Title,
    Content,
}

impl fmt::Display for TranslationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationKind::Title => write!(f, "title"),
            TranslationKind::Content => write!(f, "content"),
        }
    }
}

impl FromStr for TranslationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(TranslationKind::Title),
            "content" => Ok(TranslationKind::Content),
            _ => Err(format!("Invalid translation type: {}", s)),
        }
    }
}

/// Stored token usage record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub id: i32,
    pub user_id: String,
    pub chapter_id: i32,
    pub provider: String,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
    pub translation_type: TranslationKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTokenUsage {
    pub user_id: String,
    pub chapter_id: i32,
    pub provider: String,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
    pub translation_type: TranslationKind,
}

/// Aggregated token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub total_input_tokens: i64,
    pub total_output_tokens: i64,
    pub total_tokens: i64,
    pub record_count: i64,
}

impl UsageSummary {
    pub fn add(&mut self, usage: &TokenUsage) {
        self.total_input_tokens += i64::from(usage.input_tokens);
        self.total_output_tokens += i64::from(usage.output_tokens);
        self.total_tokens += i64::from(usage.total_tokens);
        self.record_count += 1;
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a TokenUsage>) -> Self {
        let mut summary = Self::default();
        for record in records {
            summary.add(record);
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub provider: String,
    pub summary: UsageSummary,
}

/// Optional `created_at` bounds, both inclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl UsageWindow {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at <= e)
    }
}

#[async_trait]
pub trait TokenUsageRepository: Send + Sync {
    async fn save(&self, usage: &NewTokenUsage) -> AppResult<TokenUsage>;
    /// Newest first
    async fn list_for_chapter(&self, chapter_id: i32) -> AppResult<Vec<TokenUsage>>;
    async fn summary_for_novel(&self, user_id: &str, novel_id: i32) -> AppResult<UsageSummary>;
    async fn summary_for_user(&self, user_id: &str, window: UsageWindow) -> AppResult<UsageSummary>;
    /// Sorted by provider name
    async fn summary_by_provider(
        &self,
        user_id: &str,
        window: UsageWindow,
    ) -> AppResult<Vec<ProviderUsage>>;
    /// Number of deleted records
    async fn clear_for_user(&self, user_id: &str) -> AppResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn usage(input: i32, output: i32) -> TokenUsage {
        TokenUsage {
            id: 1,
            user_id: "reader".into(),
            chapter_id: 1,
            provider: "openai".into(),
            model: "gpt-4o-mini".into(),
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
            translation_type: TranslationKind::Content,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_accumulates() {
        let records = vec![usage(100, 50), usage(10, 5)];
        let summary = UsageSummary::from_records(&records);
        assert_eq!(summary.total_input_tokens, 110);
        assert_eq!(summary.total_output_tokens, 55);
        assert_eq!(summary.total_tokens, 165);
        assert_eq!(summary.record_count, 2);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc::now();
        let window = UsageWindow {
            start: Some(now - Duration::days(1)),
            end: Some(now),
        };
        assert!(window.contains(now));
        assert!(!window.contains(now + Duration::seconds(1)));
        assert!(UsageWindow::all().contains(now));
    }

    #[test]
    fn test_translation_kind_strings() {
        assert_eq!(TranslationKind::Title.to_string(), "title");
        assert_eq!("CONTENT".parse(), Ok(TranslationKind::Content));
    }
}
