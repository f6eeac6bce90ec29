use crate::modules::translation::domain::{NewTokenUsage, TokenUsage, TranslationKind};
use crate::schema::translation_token_usage;
use crate::log_warn;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = translation_token_usage)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TokenUsageRow {
    pub id: i32,
    pub user_id: String,
    pub chapter_id: i32,
    pub provider: String,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
    pub translation_type: String,
    pub created_at: DateTime<Utc>,
}

impl From<TokenUsageRow> for TokenUsage {
    fn from(row: TokenUsageRow) -> Self {
        let translation_type = row.translation_type.parse().unwrap_or_else(|_| {
            log_warn!(
                "Unknown translation type '{}' on usage record {}",
                row.translation_type,
                row.id
            );
            TranslationKind::Content
        });

        Self {
            id: row.id,
            user_id: row.user_id,
            chapter_id: row.chapter_id,
            provider: row.provider,
            model: row.model,
            input_tokens: row.input_tokens,
            output_tokens: row.output_tokens,
            total_tokens: row.total_tokens,
            translation_type,
            created_at: row.created_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = translation_token_usage)]
pub struct NewTokenUsageRow {
    pub user_id: String,
    pub chapter_id: i32,
    pub provider: String,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
    pub translation_type: String,
}

impl From<&NewTokenUsage> for NewTokenUsageRow {
    fn from(usage: &NewTokenUsage) -> Self {
        Self {
            user_id: usage.user_id.clone(),
            chapter_id: usage.chapter_id,
            provider: usage.provider.clone(),
            model: usage.model.clone(),
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            total_tokens: usage.total_tokens,
            translation_type: usage.translation_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_translation_type_reads_as_content() {
        let row = TokenUsageRow {
            id: 7,
            user_id: "reader".into(),
            chapter_id: 1,
            provider: "google".into(),
            model: "gemini-2.0-flash".into(),
            input_tokens: 1,
            output_tokens: 2,
            total_tokens: 3,
            translation_type: "synopsis".into(),
            created_at: Utc::now(),
        };
        assert_eq!(TokenUsage::from(row).translation_type, TranslationKind::Content);
    }
}
