use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported translation providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TranslationProvider {
    /// OpenRouter chat completions - Default provider
    #[serde(rename = "openrouter")]
    OpenRouter,
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Google Gemini generateContent
    #[serde(rename = "google")]
    Google,
    /// DeepL machine translation (no prompt, no token accounting)
    #[serde(rename = "deepl")]
    DeepL,
}

impl TranslationProvider {
    pub const ALL: [TranslationProvider; 4] = [
        TranslationProvider::OpenRouter,
        TranslationProvider::OpenAi,
        TranslationProvider::Google,
        TranslationProvider::DeepL,
    ];

    /// Prefix used for the provider's environment variables (`OPENROUTER_API_KEY`, ...)
    pub fn env_prefix(&self) -> &'static str {
        match self {
            TranslationProvider::OpenRouter => "OPENROUTER",
            TranslationProvider::OpenAi => "OPENAI",
            TranslationProvider::Google => "GOOGLE",
            TranslationProvider::DeepL => "DEEPL",
        }
    }

    /// Human readable name used in error messages
    pub fn display_name(&self) -> &'static str {
        match self {
            TranslationProvider::OpenRouter => "OpenRouter",
            TranslationProvider::OpenAi => "OpenAI",
            TranslationProvider::Google => "Google",
            TranslationProvider::DeepL => "DeepL",
        }
    }

    /// Model used when the configuration does not name one
    pub fn default_model(&self) -> &'static str {
        match self {
            TranslationProvider::OpenRouter => "google/gemini-2.0-flash-001",
            TranslationProvider::OpenAi => "gpt-4o-mini",
            TranslationProvider::Google => "gemini-2.0-flash",
            TranslationProvider::DeepL => "deepl",
        }
    }

    /// Whether the provider is prompted (system/user prompt with glossary)
    pub fn uses_prompt(&self) -> bool {
        !matches!(self, TranslationProvider::DeepL)
    }
}

impl Default for TranslationProvider {
    fn default() -> Self {
        TranslationProvider::OpenRouter
    }
}

impl fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TranslationProvider::OpenRouter => "openrouter",
            TranslationProvider::OpenAi => "openai",
            TranslationProvider::Google => "google",
            TranslationProvider::DeepL => "deepl",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for TranslationProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openrouter" => Ok(TranslationProvider::OpenRouter),
            "openai" => Ok(TranslationProvider::OpenAi),
            "google" | "gemini" => Ok(TranslationProvider::Google),
            "deepl" => Ok(TranslationProvider::DeepL),
            _ => Err(format!("Unsupported translation provider: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_round_trips_through_display() {
        for provider in TranslationProvider::ALL {
            assert_eq!(provider.to_string().parse::<TranslationProvider>(), Ok(provider));
        }
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!("Gemini".parse(), Ok(TranslationProvider::Google));
        assert_eq!(" OpenAI ".parse(), Ok(TranslationProvider::OpenAi));
        assert!("anthropic-direct".parse::<TranslationProvider>().is_err());
    }

    #[test]
    fn test_only_deepl_skips_prompt() {
        assert!(!TranslationProvider::DeepL.uses_prompt());
        assert!(TranslationProvider::OpenRouter.uses_prompt());
    }
}
