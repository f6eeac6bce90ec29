pub mod add_chapter;

pub use add_chapter::{AddChapterCommand, AddChapterHandler, InsertChapterResult};
