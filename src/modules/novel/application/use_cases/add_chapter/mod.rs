mod command;
mod handler;
mod result;

pub use command::AddChapterCommand;
pub use handler::AddChapterHandler;
pub use result::{InsertChapterResult, IMPORTED_MESSAGE, SKIPPED_MESSAGE};
