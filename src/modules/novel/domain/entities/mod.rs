pub mod chapter;
pub mod novel;

pub use chapter::{Chapter, ChapterChanges, ChapterImage, NewChapter};
pub use novel::{NewNovel, Novel, NovelChanges};
