pub mod prompt;
pub mod token_usage;
pub mod translator;

pub use token_usage::{
    NewTokenUsage, ProviderUsage, TokenUsage, TokenUsageRepository, TranslationKind, UsageSummary,
    UsageWindow,
};
pub use translator::{TokenCounts, TranslationOutput, TranslationRequest, Translator};
