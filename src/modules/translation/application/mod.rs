pub mod service;

pub use service::{
    ChapterTranslationOutcome, NovelTitleOutcome, TranslateChapterOptions, TranslationService,
    NO_API_KEY_MESSAGE,
};
