pub mod chapter_inserter;
pub mod chapter_ordering;

pub use chapter_inserter::{add_chapter_atomic, remove_chapter_atomic, ChapterInsertOutcome};
pub use chapter_ordering::{
    compaction_moves, recover_position, resolve_insert_position, temporary_position,
    verify_order, OrderReport, PlacementStrategy, ShiftPlan, TEMP_POSITION_OFFSET,
};
