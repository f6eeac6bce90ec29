pub mod chapter_store;
pub mod novel_repository;

pub use chapter_store::ChapterStore;
pub use novel_repository::NovelRepository;
