use crate::modules::novel::domain::{
    entities::{Chapter, ChapterChanges, Novel, NovelChanges},
    repositories::NovelRepository,
    value_objects::TranslationStatus,
};
use crate::modules::translation::domain::{
    NewTokenUsage, TokenUsageRepository, TranslationKind, TranslationOutput, TranslationRequest,
    Translator,
};
use crate::modules::translation::infrastructure::HttpTranslator;
use crate::shared::application::ProgressReporter;
use crate::shared::config::TranslationConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::slugify_english;
use crate::{log_debug, log_info, log_warn};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const NO_API_KEY_MESSAGE: &str = "No API key configured";

/// Which parts of a chapter to translate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslateChapterOptions {
    pub translate_title: bool,
    pub translate_content: bool,
}

impl Default for TranslateChapterOptions {
    fn default() -> Self {
        Self {
            translate_title: true,
            translate_content: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterTranslationOutcome {
    pub chapter_id: i32,
    pub novel_slug: String,
    pub status: TranslationStatus,
    pub translated_title: Option<String>,
    pub content_translated: bool,
    /// Failures of individual parts that did not abort the task
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovelTitleOutcome {
    /// Slug after a possible rename
    pub novel_slug: String,
    pub translated_title: String,
    pub translated_author: Option<String>,
    pub renamed: bool,
}

/// Runs translations against the novel store and records token usage
pub struct TranslationService {
    novel_repo: Arc<dyn NovelRepository>,
    usage_repo: Arc<dyn TokenUsageRepository>,
    /// `None` when no provider key is configured
    translator: Option<Arc<dyn Translator>>,
    default_prompt_suffix: Option<String>,
}

impl TranslationService {
    pub fn new(
        novel_repo: Arc<dyn NovelRepository>,
        usage_repo: Arc<dyn TokenUsageRepository>,
        translator: Option<Arc<dyn Translator>>,
        default_prompt_suffix: Option<String>,
    ) -> Self {
        Self {
            novel_repo,
            usage_repo,
            translator,
            default_prompt_suffix,
        }
    }

    /// Service using the configured provider; a missing key only fails the tasks
    pub fn from_config(
        config: &TranslationConfig,
        novel_repo: Arc<dyn NovelRepository>,
        usage_repo: Arc<dyn TokenUsageRepository>,
    ) -> AppResult<Self> {
        let translator: Option<Arc<dyn Translator>> = match config.active_settings() {
            Ok(_) => Some(Arc::new(HttpTranslator::from_config(config)?)),
            Err(e) => {
                log_warn!("Translations will fail until a key is configured: {}", e);
                None
            }
        };

        Ok(Self::new(
            novel_repo,
            usage_repo,
            translator,
            config.custom_prompt_suffix.clone(),
        ))
    }

    fn translator(&self) -> AppResult<&Arc<dyn Translator>> {
        self.translator
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized(NO_API_KEY_MESSAGE.to_string()))
    }

    /// The novel's own suffix wins over the configured one
    fn prompt_suffix(&self, novel: &Novel) -> Option<String> {
        novel
            .custom_prompt_suffix
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.default_prompt_suffix.clone())
    }

    /// Translate a chapter's title and/or content.
    ///
    /// The chapter ends `completed` when at least one part was translated and
    /// `failed` otherwise. When every requested part failed the first error is
    /// returned so the job can be retried.
    pub async fn translate_chapter(
        &self,
        user_id: &str,
        novel_slug: &str,
        chapter_id: i32,
        options: TranslateChapterOptions,
        task_id: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> AppResult<ChapterTranslationOutcome> {
        let result = self
            .run_chapter_translation(user_id, novel_slug, chapter_id, options, task_id, progress)
            .await;

        if let Err(e) = &result {
            log_warn!("Translation of chapter {} failed: {}", chapter_id, e);
            self.mark_failed(user_id, chapter_id).await;
        }
        result
    }

    async fn run_chapter_translation(
        &self,
        user_id: &str,
        novel_slug: &str,
        chapter_id: i32,
        options: TranslateChapterOptions,
        task_id: Option<&str>,
        progress: &dyn ProgressReporter,
    ) -> AppResult<ChapterTranslationOutcome> {
        progress.report("Loading chapter data...").await;

        let novel = self
            .novel_repo
            .get_novel(user_id, novel_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;
        let chapter = self
            .novel_repo
            .get_chapter(user_id, chapter_id)
            .await?
            .filter(|c| c.novel_id == novel.id)
            .ok_or_else(|| AppError::NotFound(format!("Chapter {} not found", chapter_id)))?;

        let started = ChapterChanges {
            translation_task_id: task_id.map(str::to_string),
            translation_started_at: Some(Utc::now()),
            ..ChapterChanges::status(TranslationStatus::InProgress)
        };
        self.novel_repo
            .update_chapter(user_id, chapter_id, &started)
            .await?;

        let translator = Arc::clone(self.translator()?);
        let suffix = self.prompt_suffix(&novel);
        let glossary = Some(novel.glossary.clone());

        let mut changes = ChapterChanges::default();
        let mut errors: Vec<AppError> = Vec::new();

        if options.translate_title {
            progress.report("Translating title...").await;
            let request = TranslationRequest::new(chapter.title.clone())
                .with_glossary(glossary.clone())
                .with_prompt_suffix(suffix.clone());

            match translator.translate(&request).await {
                Ok(output) => {
                    self.record_usage(user_id, &chapter, &output, TranslationKind::Title)
                        .await;
                    changes.translated_title = Some(output.text);
                }
                Err(e) => errors.push(e),
            }
        }

        if options.translate_content {
            progress.report("Translating content...").await;
            let request = TranslationRequest::new(chapter.content.clone())
                .with_glossary(glossary)
                .with_images(chapter.images.clone())
                .with_prompt_suffix(suffix);

            match translator.translate(&request).await {
                Ok(output) => {
                    self.record_usage(user_id, &chapter, &output, TranslationKind::Content)
                        .await;
                    changes.translated_content = Some(output.text);
                }
                Err(e) => errors.push(e),
            }
        }

        let translated_title = changes.translated_title.clone();
        let content_translated = changes.translated_content.is_some();

        let status = if changes.is_empty() {
            TranslationStatus::Failed
        } else {
            changes.translation_model = Some(translator.model());
            changes.translation_completed_at = Some(Utc::now());
            TranslationStatus::Completed
        };
        changes.translation_status = Some(status);
        self.novel_repo
            .update_chapter(user_id, chapter_id, &changes)
            .await?;

        if status == TranslationStatus::Failed && !errors.is_empty() {
            return Err(errors.remove(0));
        }

        log_info!(
            "Chapter {} of '{}' translation {} ({} part errors)",
            chapter_id,
            novel.slug,
            status,
            errors.len()
        );

        Ok(ChapterTranslationOutcome {
            chapter_id,
            novel_slug: novel.slug,
            status,
            translated_title,
            content_translated,
            errors: errors.iter().map(ToString::to_string).collect(),
        })
    }

    /// Translate only a chapter's title; translation errors are returned
    pub async fn translate_chapter_title(&self, user_id: &str, chapter_id: i32) -> AppResult<String> {
        let translator = Arc::clone(self.translator()?);

        let chapter = self
            .novel_repo
            .get_chapter(user_id, chapter_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chapter {} not found", chapter_id)))?;
        let novel = self
            .novel_repo
            .list_user_novels(user_id)
            .await?
            .into_iter()
            .find(|n| n.id == chapter.novel_id);

        let mut request = TranslationRequest::new(chapter.title.clone());
        if let Some(novel) = &novel {
            request = request
                .with_glossary(Some(novel.glossary.clone()))
                .with_prompt_suffix(self.prompt_suffix(novel));
        } else {
            request = request.with_prompt_suffix(self.default_prompt_suffix.clone());
        }

        let output = translator.translate(&request).await?;
        self.record_usage(user_id, &chapter, &output, TranslationKind::Title)
            .await;

        let changes = ChapterChanges {
            translated_title: Some(output.text.clone()),
            ..Default::default()
        };
        self.novel_repo
            .update_chapter(user_id, chapter_id, &changes)
            .await?;

        log_debug!("Translated title of chapter {}", chapter_id);
        Ok(output.text)
    }

    /// Translate a novel's title and author, then move the novel to the
    /// English slug when that slug is free.
    pub async fn translate_novel_title(
        &self,
        user_id: &str,
        novel_slug: &str,
        progress: &dyn ProgressReporter,
    ) -> AppResult<NovelTitleOutcome> {
        progress.report("Loading novel data...").await;
        let novel = self
            .novel_repo
            .get_novel(user_id, novel_slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;
        let translator = Arc::clone(self.translator()?);

        progress.report("Translating title...").await;
        let translated_title = match translator
            .translate(&TranslationRequest::new(novel.title.clone()))
            .await
        {
            Ok(output) if !output.text.trim().is_empty() => output.text.trim().to_string(),
            Ok(_) => novel.title.clone(),
            Err(e) => {
                log_warn!("Keeping original title of '{}': {}", novel.slug, e);
                novel.title.clone()
            }
        };

        let mut translated_author = None;
        if let Some(author) = novel.author.as_deref().filter(|a| !a.trim().is_empty()) {
            progress.report("Translating author...").await;
            translated_author = match translator
                .translate(&TranslationRequest::new(author))
                .await
            {
                Ok(output) if !output.text.trim().is_empty() => Some(output.text.trim().to_string()),
                Ok(_) => Some(author.to_string()),
                Err(e) => {
                    log_warn!("Keeping original author of '{}': {}", novel.slug, e);
                    Some(author.to_string())
                }
            };
        }

        let mut changes = NovelChanges {
            translated_title: Some(translated_title.clone()),
            translated_author: translated_author.clone(),
            ..Default::default()
        };

        let english_slug = slugify_english(&translated_title);
        if english_slug != novel.slug
            && self
                .novel_repo
                .get_novel(user_id, &english_slug)
                .await?
                .is_none()
        {
            changes.slug = Some(english_slug);
        }

        let updated = self
            .novel_repo
            .update_novel(user_id, &novel.slug, &changes)
            .await?;
        let renamed = updated.slug != novel.slug;
        if renamed {
            log_info!("Renamed novel '{}' to '{}'", novel.slug, updated.slug);
        }

        Ok(NovelTitleOutcome {
            novel_slug: updated.slug,
            translated_title,
            translated_author,
            renamed,
        })
    }

    /// Best effort; the chapter may be gone
    pub async fn mark_failed(&self, user_id: &str, chapter_id: i32) {
        let changes = ChapterChanges::status(TranslationStatus::Failed);
        if let Err(e) = self
            .novel_repo
            .update_chapter(user_id, chapter_id, &changes)
            .await
        {
            log_debug!("Could not mark chapter {} failed: {}", chapter_id, e);
        }
    }

    /// Usage bookkeeping never fails a translation
    async fn record_usage(
        &self,
        user_id: &str,
        chapter: &Chapter,
        output: &TranslationOutput,
        kind: TranslationKind,
    ) {
        let Some(counts) = &output.token_usage else {
            return;
        };

        let usage = NewTokenUsage {
            user_id: user_id.to_string(),
            chapter_id: chapter.id,
            provider: counts.provider.to_string(),
            model: counts.model.clone(),
            input_tokens: counts.input_tokens,
            output_tokens: counts.output_tokens,
            total_tokens: counts.total_tokens,
            translation_type: kind,
        };

        if let Err(e) = self.usage_repo.save(&usage).await {
            log_warn!("Failed to record {} token usage for chapter {}: {}", kind, chapter.id, e);
        }
    }
}
