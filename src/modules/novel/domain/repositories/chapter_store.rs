use crate::modules::novel::domain::entities::{Chapter, NewChapter, Novel};
use crate::shared::errors::AppResult;

/// Transaction-scoped view of the chapter tables used by the ordered inserter.
///
/// An implementation represents one open transaction: the novel lock taken by
/// [`ChapterStore::lock_novel_for_update`] is held until the transaction ends,
/// and every `update_positions` call is a flush that must satisfy the unique
/// `(novel_id, position)` constraint on its own.
pub trait ChapterStore {
    /// `SELECT ... FOR UPDATE` on the novel row
    fn lock_novel_for_update(&mut self, user_id: &str, novel_slug: &str)
        -> AppResult<Option<Novel>>;

    fn find_chapter_by_source_url(
        &mut self,
        novel_id: i32,
        source_url: &str,
    ) -> AppResult<Option<Chapter>>;

    /// Chapters of the novel in ascending position order
    fn list_chapters_by_position(&mut self, novel_id: i32) -> AppResult<Vec<Chapter>>;

    /// Apply `(chapter_id, position)` moves and flush them
    fn update_positions(&mut self, novel_id: i32, moves: &[(i32, i32)]) -> AppResult<()>;

    fn insert_chapter(
        &mut self,
        novel_id: i32,
        chapter: &NewChapter,
        position: i32,
    ) -> AppResult<Chapter>;

    /// Delete one chapter of the novel together with its token usage
    fn delete_chapter(&mut self, novel_id: i32, chapter_id: i32) -> AppResult<bool>;
}
