pub mod memory;
pub mod models;
pub mod repository;

pub use memory::{InMemoryNovelRepository, MemoryDatabase, MemoryTables, MemoryTransaction};
pub use repository::{NovelRepositoryImpl, PgChapterStore};
