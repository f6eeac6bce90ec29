pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    ChapterTranslationOutcome, NovelTitleOutcome, TranslateChapterOptions, TranslationService,
};
pub use domain::{
    NewTokenUsage, TokenCounts, TokenUsage, TokenUsageRepository, TranslationKind,
    TranslationOutput, TranslationRequest, Translator, UsageSummary, UsageWindow,
};
pub use infrastructure::{
    HttpTranslator, InMemoryTokenUsageRepository, RateLimitClient, TokenUsageRepositoryImpl,
};
