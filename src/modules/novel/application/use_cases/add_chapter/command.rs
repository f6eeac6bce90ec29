use crate::modules::novel::domain::entities::NewChapter;

/// Command for importing one chapter into a novel
#[derive(Debug, Clone)]
pub struct AddChapterCommand {
    pub user_id: String,
    pub novel_slug: String,
    pub chapter: NewChapter,
}

impl AddChapterCommand {
    pub fn new(user_id: impl Into<String>, novel_slug: impl Into<String>, chapter: NewChapter) -> Self {
        Self {
            user_id: user_id.into(),
            novel_slug: novel_slug.into(),
            chapter,
        }
    }
}
