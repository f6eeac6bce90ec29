/// Ordered chapter insertion
///
/// Runs inside one store transaction. The novel row lock serializes writers of
/// the same novel; everything after it reads and writes a stable snapshot.
use super::chapter_ordering::{
    compaction_moves, resolve_insert_position, verify_order, OrderReport, PlacementStrategy,
    ShiftPlan,
};
use crate::modules::novel::domain::entities::NewChapter;
use crate::modules::novel::domain::repositories::ChapterStore;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_debug, log_info, log_warn};
use serde::{Deserialize, Serialize};

/// What `add_chapter_atomic` did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInsertOutcome {
    pub novel_id: i32,
    pub novel_slug: String,
    pub chapter_id: i32,
    pub position: i32,
    pub already_exists: bool,
    /// `None` for a skipped duplicate
    pub placement: Option<PlacementStrategy>,
    /// Chapters moved to make room
    pub shifted: usize,
    /// Post-insert check; `None` for a skipped duplicate
    pub order_report: Option<OrderReport>,
}

/// Insert `chapter` into the novel at its ordered position.
///
/// The caller owns the transaction: an error from any step must roll back
/// everything the store has flushed so far.
pub fn add_chapter_atomic<S: ChapterStore + ?Sized>(
    store: &mut S,
    user_id: &str,
    novel_slug: &str,
    chapter: &NewChapter,
) -> AppResult<ChapterInsertOutcome> {
    let novel = store
        .lock_novel_for_update(user_id, novel_slug)?
        .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;

    let dedup_key = chapter
        .source_url
        .as_deref()
        .filter(|url| !url.trim().is_empty());
    if let Some(source_url) = dedup_key {
        if let Some(existing) = store.find_chapter_by_source_url(novel.id, source_url)? {
            log_debug!(
                "Chapter {} already imported into '{}' at position {}",
                source_url,
                novel.slug,
                existing.position
            );
            return Ok(ChapterInsertOutcome {
                novel_id: novel.id,
                novel_slug: novel.slug,
                chapter_id: existing.id,
                position: existing.position,
                already_exists: true,
                placement: None,
                shifted: 0,
                order_report: None,
            });
        }
    }

    let existing = store.list_chapters_by_position(novel.id)?;
    let (position, placement) = resolve_insert_position(&existing, chapter)?;

    let mut shifted = 0;
    if let Some(plan) = ShiftPlan::open_gap_at(&existing, position) {
        log_debug!(
            "Shifting {} chapters of '{}' from position {}",
            plan.len(),
            novel.slug,
            position
        );
        store.update_positions(novel.id, &plan.park)?;
        store.update_positions(novel.id, &plan.settle)?;
        shifted = plan.len();
    }

    let inserted = store.insert_chapter(novel.id, chapter, position)?;

    let report = verify_order(&store.list_chapters_by_position(novel.id)?);
    if !report.is_consistent() {
        log_warn!(
            "Chapter order of '{}' is inconsistent after insert: {:?}",
            novel.slug,
            report
        );
    }

    log_info!(
        "Inserted chapter '{}' into '{}' at position {} ({:?}, {} shifted)",
        inserted.slug,
        novel.slug,
        position,
        placement,
        shifted
    );

    Ok(ChapterInsertOutcome {
        novel_id: novel.id,
        novel_slug: novel.slug,
        chapter_id: inserted.id,
        position,
        already_exists: false,
        placement: Some(placement),
        shifted,
        order_report: Some(report),
    })
}

/// Delete a chapter and renumber the rest of the novel densely.
///
/// Returns `false` when the novel has no such chapter.
pub fn remove_chapter_atomic<S: ChapterStore + ?Sized>(
    store: &mut S,
    user_id: &str,
    novel_slug: &str,
    chapter_id: i32,
) -> AppResult<bool> {
    let novel = store
        .lock_novel_for_update(user_id, novel_slug)?
        .ok_or_else(|| AppError::NotFound(format!("Novel '{}' not found", novel_slug)))?;

    if !store.delete_chapter(novel.id, chapter_id)? {
        return Ok(false);
    }

    let remaining = store.list_chapters_by_position(novel.id)?;
    let moves = compaction_moves(&remaining);
    if !moves.is_empty() {
        store.update_positions(novel.id, &moves)?;
    }

    log_info!(
        "Deleted chapter {} from '{}' ({} renumbered)",
        chapter_id,
        novel.slug,
        moves.len()
    );
    Ok(true)
}
