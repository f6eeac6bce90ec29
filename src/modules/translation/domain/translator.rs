use crate::modules::novel::domain::{entities::ChapterImage, value_objects::Glossary};
use crate::shared::domain::TranslationProvider;
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Text to translate plus the context the prompt is built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    pub glossary: Option<Glossary>,
    pub images: Vec<ChapterImage>,
    pub custom_prompt_suffix: Option<String>,
    /// Hint such as "korean" or "ja"; detected from the text when absent
    pub source_language: Option<String>,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_glossary(mut self, glossary: Option<Glossary>) -> Self {
        self.glossary = glossary.filter(|g| !g.is_empty());
        self
    }

    pub fn with_images(mut self, images: Vec<ChapterImage>) -> Self {
        self.images = images;
        self
    }

    pub fn with_prompt_suffix(mut self, suffix: Option<String>) -> Self {
        self.custom_prompt_suffix = suffix.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub provider: TranslationProvider,
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    pub total_tokens: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationOutput {
    pub text: String,
    /// `None` for providers without token accounting (DeepL)
    pub token_usage: Option<TokenCounts>,
}

/// Uniform invocation of a translation provider
#[async_trait]
pub trait Translator: Send + Sync {
    fn provider(&self) -> TranslationProvider;
    fn model(&self) -> String;
    async fn translate(&self, request: &TranslationRequest) -> AppResult<TranslationOutput>;
}
