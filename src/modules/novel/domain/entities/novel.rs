/// Novel aggregate: the parent work owning an ordered chapter list
use crate::modules::novel::domain::value_objects::Glossary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Novel {
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
    pub glossary: Glossary,
    pub source_url: Option<String>,
    pub custom_prompt_suffix: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Novel {
    /// Title shown to readers: translated when available
    pub fn display_title(&self) -> &str {
        self.translated_title
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or(&self.title)
    }

    pub fn matches_title(&self, title: &str) -> bool {
        self.title == title
            || self.original_title.as_deref() == Some(title)
            || self.translated_title.as_deref() == Some(title)
    }
}

/// Novel to be created (before insertion)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNovel {
    pub slug: String,
    pub title: String,
    pub original_title: Option<String>,
    pub translated_title: Option<String>,
    pub author: Option<String>,
    pub translated_author: Option<String>,
    pub cover_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub translated_tags: Vec<String>,
    pub synopsis: Option<String>,
    pub translated_synopsis: Option<String>,
    pub source_url: Option<String>,
    #[serde(default)]
    pub glossary: Glossary,
    pub custom_prompt_suffix: Option<String>,
}

impl NewNovel {
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_source_url(mut self, source_url: impl Into<String>) -> Self {
        self.source_url = Some(source_url.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = glossary;
        self
    }
}

/// Field-wise update of a novel; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NovelChanges {
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
    pub source_url: Option<String>,
    pub glossary: Option<Glossary>,
    pub custom_prompt_suffix: Option<String>,
}

impl NovelChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Apply the changes to an in-memory copy of the novel
    pub fn apply_to(&self, novel: &mut Novel) {
        macro_rules! set {
            ($field:ident) => {
                if let Some(value) = &self.$field {
                    novel.$field = value.clone();
                }
            };
            (opt $field:ident) => {
                if let Some(value) = &self.$field {
                    novel.$field = Some(value.clone());
                }
            };
        }

        set!(slug);
        set!(title);
        set!(opt original_title);
        set!(opt translated_title);
        set!(opt author);
        set!(opt translated_author);
        set!(opt cover_url);
        set!(tags);
        set!(translated_tags);
        set!(opt synopsis);
        set!(opt translated_synopsis);
        set!(opt source_url);
        set!(glossary);
        set!(opt custom_prompt_suffix);
        novel.updated_at = Utc::now();
    }
}
