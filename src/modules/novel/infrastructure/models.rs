use crate::modules::novel::domain::entities::{
    Chapter, ChapterChanges, ChapterImage, NewChapter, NewNovel, Novel, NovelChanges,
};
use crate::modules::novel::domain::value_objects::{Glossary, TranslationStatus};
use crate::schema::{chapters, novels};
use crate::log_warn;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

// ================== NOVEL MODELS ==================

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = novels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NovelRow {
    pub id: i32,
    pub user_id: String,
    pub slug: String,
    pub title: String,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub author: Option<String>,
    pub translated_author: Option<String>,
    pub cover_url: Option<String>,
    pub tags: Vec<String>,
    pub translated_tags: Vec<String>,
    pub synopsis: Option<String>,
    pub translated_synopsis: Option<String>,
    pub glossary: serde_json::Value,
    pub source_url: Option<String>,
    pub custom_prompt_suffix: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NovelRow> for Novel {
    fn from(row: NovelRow) -> Self {
        Novel {
            id: row.id,
            user_id: row.user_id,
            slug: row.slug,
            title: row.title,
            original_title: row.original_title,
            translated_title: row.translated_title,
            author: row.author,
            translated_author: row.translated_author,
            cover_url: row.cover_url,
            tags: row.tags,
            translated_tags: row.translated_tags,
            synopsis: row.synopsis,
            translated_synopsis: row.translated_synopsis,
            glossary: Glossary::from_json(&row.glossary),
            source_url: row.source_url,
            custom_prompt_suffix: row.custom_prompt_suffix,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = novels)]
pub struct NewNovelRow {
    pub user_id: String,
    pub slug: String,
    pub title: String,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub author: Option<String>,
    pub translated_author: Option<String>,
    pub cover_url: Option<String>,
    pub tags: Vec<String>,
    pub translated_tags: Vec<String>,
    pub synopsis: Option<String>,
    pub translated_synopsis: Option<String>,
    pub glossary: serde_json::Value,
    pub source_url: Option<String>,
    pub custom_prompt_suffix: Option<String>,
}

impl NewNovelRow {
    pub fn from_domain(user_id: &str, novel: &NewNovel) -> Self {
        Self {
            user_id: user_id.to_string(),
            slug: novel.slug.clone(),
            title: novel.title.clone(),
            original_title: novel.original_title.clone(),
            translated_title: novel.translated_title.clone(),
            author: novel.author.clone(),
            translated_author: novel.translated_author.clone(),
            cover_url: novel.cover_url.clone(),
            tags: novel.tags.clone(),
            translated_tags: novel.translated_tags.clone(),
            synopsis: novel.synopsis.clone(),
            translated_synopsis: novel.translated_synopsis.clone(),
            glossary: novel.glossary.to_json(),
            source_url: novel.source_url.clone(),
            custom_prompt_suffix: novel.custom_prompt_suffix.clone(),
        }
    }
}

/// `None` fields are left out of the UPDATE
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = novels)]
pub struct NovelChangeset {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub author: Option<String>,
    pub translated_author: Option<String>,
    pub cover_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub translated_tags: Option<Vec<String>>,
    pub synopsis: Option<String>,
    pub translated_synopsis: Option<String>,
    pub glossary: Option<serde_json::Value>,
    pub source_url: Option<String>,
    pub custom_prompt_suffix: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&NovelChanges> for NovelChangeset {
    fn from(changes: &NovelChanges) -> Self {
        Self {
            slug: changes.slug.clone(),
            title: changes.title.clone(),
            original_title: changes.original_title.clone(),
            translated_title: changes.translated_title.clone(),
            author: changes.author.clone(),
            translated_author: changes.translated_author.clone(),
            cover_url: changes.cover_url.clone(),
            tags: changes.tags.clone(),
            translated_tags: changes.translated_tags.clone(),
            synopsis: changes.synopsis.clone(),
            translated_synopsis: changes.translated_synopsis.clone(),
            glossary: changes.glossary.as_ref().map(Glossary::to_json),
            source_url: changes.source_url.clone(),
            custom_prompt_suffix: changes.custom_prompt_suffix.clone(),
            updated_at: Some(Utc::now()),
        }
    }
}

// ================== CHAPTER MODELS ==================

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = chapters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChapterRow {
    pub id: i32,
    pub novel_id: i32,
    pub slug: String,
    pub title: String,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub chapter_number: Option<String>,
    pub content: String,
    pub translated_content: Option<String>,
    pub translation_model: Option<String>,
    pub translation_status: TranslationStatus,
    pub translation_task_id: Option<String>,
    pub translation_started_at: Option<DateTime<Utc>>,
    pub translation_completed_at: Option<DateTime<Utc>>,
    pub images: serde_json::Value,
    pub source_url: Option<String>,
    pub position: i32,
    pub is_bonus: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChapterRow> for Chapter {
    fn from(row: ChapterRow) -> Self {
        let images = images_from_json(row.id, row.images);
        Chapter {
            id: row.id,
            novel_id: row.novel_id,
            slug: row.slug,
            title: row.title,
            original_title: row.original_title,
            translated_title: row.translated_title,
            chapter_number: row.chapter_number,
            content: row.content,
            translated_content: row.translated_content,
            translation_model: row.translation_model,
            translation_status: row.translation_status,
            translation_task_id: row.translation_task_id,
            translation_started_at: row.translation_started_at,
            translation_completed_at: row.translation_completed_at,
            images,
            source_url: row.source_url,
            position: row.position,
            is_bonus: row.is_bonus,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn images_from_json(chapter_id: i32, value: serde_json::Value) -> Vec<ChapterImage> {
    if value.is_null() {
        return Vec::new();
    }
    serde_json::from_value(value).unwrap_or_else(|e| {
        log_warn!("Ignoring malformed images of chapter {}: {}", chapter_id, e);
        Vec::new()
    })
}

fn images_to_json(images: &[ChapterImage]) -> serde_json::Value {
    serde_json::to_value(images).unwrap_or_else(|_| serde_json::Value::Array(vec![]))
}

#[derive(Insertable, Debug)]
#[diesel(table_name = chapters)]
pub struct NewChapterRow {
    pub novel_id: i32,
    pub slug: String,
    pub title: String,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub chapter_number: Option<String>,
    pub content: String,
    pub translation_status: TranslationStatus,
    pub images: serde_json::Value,
    pub source_url: Option<String>,
    pub position: i32,
    pub is_bonus: bool,
}

impl NewChapterRow {
    pub fn from_domain(novel_id: i32, chapter: &NewChapter, position: i32) -> Self {
        Self {
            novel_id,
            slug: chapter.slug.clone(),
            title: chapter.title.clone(),
            original_title: chapter.original_title.clone(),
            translated_title: chapter.translated_title.clone(),
            chapter_number: chapter.chapter_number.clone(),
            content: chapter.content.clone(),
            translation_status: TranslationStatus::Pending,
            images: images_to_json(&chapter.images),
            source_url: chapter.source_url.clone(),
            position,
            is_bonus: chapter.is_bonus,
        }
    }
}

#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = chapters)]
pub struct ChapterChangeset {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub chapter_number: Option<String>,
    pub content: Option<String>,
    pub translated_content: Option<String>,
    pub translation_model: Option<String>,
    pub translation_status: Option<TranslationStatus>,
    pub translation_task_id: Option<String>,
    pub translation_started_at: Option<DateTime<Utc>>,
    pub translation_completed_at: Option<DateTime<Utc>>,
    pub images: Option<serde_json::Value>,
    pub source_url: Option<String>,
    pub is_bonus: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&ChapterChanges> for ChapterChangeset {
    fn from(changes: &ChapterChanges) -> Self {
        Self {
            slug: changes.slug.clone(),
            title: changes.title.clone(),
            original_title: changes.original_title.clone(),
            translated_title: changes.translated_title.clone(),
            chapter_number: changes.chapter_number.clone(),
            content: changes.content.clone(),
            translated_content: changes.translated_content.clone(),
            translation_model: changes.translation_model.clone(),
            translation_status: changes.translation_status,
            translation_task_id: changes.translation_task_id.clone(),
            translation_started_at: changes.translation_started_at,
            translation_completed_at: changes.translation_completed_at,
            images: changes.images.as_deref().map(images_to_json),
            source_url: changes.source_url.clone(),
            is_bonus: changes.is_bonus,
            updated_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_malformed_images_fall_back_to_empty() {
        assert!(images_from_json(1, json!("not a list")).is_empty());
        assert!(images_from_json(1, serde_json::Value::Null).is_empty());

        let images = images_from_json(1, json!([{"index": 0, "url": "a.png"}]));
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].url.as_deref(), Some("a.png"));
    }

    #[test]
    fn test_new_chapter_row_starts_pending() {
        let chapter = NewChapter::new("ch-1").with_title("Prologue");
        let row = NewChapterRow::from_domain(3, &chapter, 0);
        assert_eq!(row.translation_status, TranslationStatus::Pending);
        assert_eq!(row.images, json!([]));
    }
}
