/// Chapter entity: one positioned entry in a novel's chapter sequence
use crate::modules::novel::domain::value_objects::{
    extract_episode_id, ChapterRank, TranslationStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Image reference inside chapter content, rendered as `[IMAGE_{index}]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterImage {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
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
    pub images: Vec<ChapterImage>,
    pub source_url: Option<String>,
    pub position: i32,
    pub is_bonus: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chapter {
    /// Build the row that an insert of `new` at `position` produces
    pub fn from_new(id: i32, novel_id: i32, new: &NewChapter, position: i32) -> Self {
        let now = Utc::now();
        Self {
            id,
            novel_id,
            slug: new.slug.clone(),
            title: new.title.clone(),
            original_title: new.original_title.clone(),
            translated_title: new.translated_title.clone(),
            chapter_number: new.chapter_number.clone(),
            content: new.content.clone(),
            translated_content: None,
            translation_model: None,
            translation_status: TranslationStatus::Pending,
            translation_task_id: None,
            translation_started_at: None,
            translation_completed_at: None,
            images: new.images.clone(),
            source_url: new.source_url.clone(),
            position,
            is_bonus: new.is_bonus,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn episode_id(&self) -> Option<i64> {
        extract_episode_id(self.source_url.as_deref())
    }

    pub fn rank(&self) -> ChapterRank {
        ChapterRank::parse(self.chapter_number.as_deref())
    }
}

/// Chapter payload handed over by the importer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewChapter {
    pub slug: String,
    #[serde(default)]
    pub title: String,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub chapter_number: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub images: Vec<ChapterImage>,
    pub source_url: Option<String>,
    /// Caller-directed position; skips ranking when set
    pub position: Option<i32>,
    #[serde(default)]
    pub is_bonus: bool,
}

impl NewChapter {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    pub fn with_chapter_number(mut self, chapter_number: impl Into<String>) -> Self {
        self.chapter_number = Some(chapter_number.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn at_position(mut self, position: i32) -> Self {
        self.position = Some(position);
        self
    }

    pub fn bonus(mut self) -> Self {
        self.is_bonus = true;
        self
    }

    pub fn episode_id(&self) -> Option<i64> {
        extract_episode_id(self.source_url.as_deref())
    }

    pub fn rank(&self) -> ChapterRank {
        ChapterRank::parse(self.chapter_number.as_deref())
    }
}

/// Field-wise update of a chapter; positions are owned by the inserter and not editable here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterChanges {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub chapter_number: Option<String>,
    pub content: Option<String>,
    pub translated_content: Option<String>,
    pub translation_model: Option<String>,
    pub images: Option<Vec<ChapterImage>>,
    pub source_url: Option<String>,
    pub is_bonus: Option<bool>,
    pub translation_status: Option<TranslationStatus>,
    pub translation_task_id: Option<String>,
    pub translation_started_at: Option<DateTime<Utc>>,
    pub translation_completed_at: Option<DateTime<Utc>>,
}

impl ChapterChanges {
    pub fn status(status: TranslationStatus) -> Self {
        Self {
            translation_status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn apply_to(&self, chapter: &mut Chapter) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(value) = &self.$field {
                    chapter.$field = value.clone();
                }
            };
            (opt $field:ident) => {
                if let Some(value) = &self.$field {
                    chapter.$field = Some(value.clone());
                }
            };
        }

        set!(slug);
        set!(title);
        set!(opt original_title);
        set!(opt translated_title);
        set!(opt chapter_number);
        set!(content);
        set!(opt translated_content);
        set!(opt translation_model);
        set!(images);
        set!(opt source_url);
        set!(is_bonus);
        set!(translation_status);
        set!(opt translation_task_id);
        set!(opt translation_started_at);
        set!(opt translation_completed_at);
        chapter.updated_at = Utc::now();
    }
}
