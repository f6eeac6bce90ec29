pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    AddChapterCommand, AddChapterHandler, ChapterOrderDiagnosis, ChapterOrderEntry,
    InsertChapterResult, NovelService,
};
pub use domain::{
    Chapter, ChapterChanges, ChapterImage, ChapterInsertOutcome, ChapterStore, Glossary,
    GlossaryEntry, NewChapter, NewNovel, Novel, NovelChanges, NovelRepository, OrderReport,
    PronounHint, TranslationStatus,
};
pub use infrastructure::{InMemoryNovelRepository, MemoryDatabase, NovelRepositoryImpl};
