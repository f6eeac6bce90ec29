pub mod chapter_rank;
pub mod episode_id;
pub mod glossary;
pub mod translation_status;

pub use chapter_rank::ChapterRank;
pub use episode_id::extract_episode_id;
pub use glossary::{Glossary, GlossaryEntry, PronounHint};
pub use translation_status::TranslationStatus;
