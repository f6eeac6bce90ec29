mod translation_provider;

pub use translation_provider::TranslationProvider;
