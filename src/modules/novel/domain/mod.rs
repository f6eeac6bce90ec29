pub mod entities;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{Chapter, ChapterChanges, ChapterImage, NewChapter, NewNovel, Novel, NovelChanges};
pub use repositories::{ChapterStore, NovelRepository};
pub use services::{ChapterInsertOutcome, OrderReport};
pub use value_objects::{ChapterRank, Glossary, GlossaryEntry, PronounHint, TranslationStatus};
