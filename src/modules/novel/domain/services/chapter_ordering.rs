/// Position arithmetic for the ordered chapter inserter
///
/// Everything here is pure: it works on a snapshot of a novel's chapters
/// (sorted by position) and produces decisions that the store applies.
use crate::modules::novel::domain::entities::{Chapter, NewChapter};
use crate::shared::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Offset used to park shifted chapters on negative positions.
pub const TEMP_POSITION_OFFSET: i32 = 1000;

/// Parking slot of a chapter whose final position will be recomputed
pub fn temporary_position(position: i32) -> i32 {
    -(position + TEMP_POSITION_OFFSET)
}

/// Inverse of [`temporary_position`]
pub fn recover_position(temporary: i32) -> i32 {
    -temporary - TEMP_POSITION_OFFSET
}

/// How the insert index was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    Explicit,
    EpisodeId,
    ChapterNumber,
}

/// Resolve the index at which `chapter` belongs in `existing`.
///
/// `existing` must be sorted by position. Ties never move existing chapters:
/// only a strictly greater key wins the slot, so an equal key lands after.
pub fn resolve_insert_position(
    existing: &[Chapter],
    chapter: &NewChapter,
) -> AppResult<(i32, PlacementStrategy)> {
    let count = existing.len() as i32;

    if let Some(position) = chapter.position {
        if position < 0 {
            return Err(AppError::InvalidInput(format!(
                "Chapter position must not be negative, got {}",
                position
            )));
        }
        return Ok((position.min(count), PlacementStrategy::Explicit));
    }

    if let Some(new_episode) = chapter.episode_id() {
        let index = existing
            .iter()
            .position(|c| c.episode_id().map_or(false, |ep| ep > new_episode))
            .map_or(count, |i| i as i32);
        return Ok((index, PlacementStrategy::EpisodeId));
    }

    let new_rank = chapter.rank();
    let index = existing
        .iter()
        .position(|c| c.rank() > new_rank)
        .map_or(count, |i| i as i32);
    Ok((index, PlacementStrategy::ChapterNumber))
}

/// Two flushes that open a gap at `index` without ever colliding on the
/// unique `(novel_id, position)` index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShiftPlan {
    /// `(chapter_id, temporary_position)` pairs of the first flush
    pub park: Vec<(i32, i32)>,
    /// `(chapter_id, final_position)` pairs of the second flush
    pub settle: Vec<(i32, i32)>,
}

impl ShiftPlan {
    /// Plan the shift of every chapter at or after `index`.
    ///
    /// Returns `None` for an append, where nothing has to move.
    pub fn open_gap_at(existing: &[Chapter], index: i32) -> Option<Self> {
        if index >= existing.len() as i32 {
            return None;
        }

        let park: Vec<(i32, i32)> = existing
            .iter()
            .filter(|c| c.position >= index)
            .map(|c| (c.id, temporary_position(c.position)))
            .collect();

        if park.is_empty() {
            return None;
        }

        let settle = park
            .iter()
            .map(|&(id, temp)| (id, recover_position(temp) + 1))
            .collect();

        Some(Self { park, settle })
    }

    pub fn len(&self) -> usize {
        self.park.len()
    }

    pub fn is_empty(&self) -> bool {
        self.park.is_empty()
    }
}

/// Moves that renumber `chapters` (sorted by position) to `0..len`.
///
/// Applied in order, every move targets a slot that is already free.
pub fn compaction_moves(chapters: &[Chapter]) -> Vec<(i32, i32)> {
    chapters
        .iter()
        .enumerate()
        .filter(|(index, c)| c.position != *index as i32)
        .map(|(index, c)| (c.id, index as i32))
        .collect()
}

/// Read-only health check of a novel's chapter sequence
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderReport {
    pub chapter_count: usize,
    /// Positions are exactly `0..chapter_count`
    pub is_dense: bool,
    pub duplicate_positions: Vec<i32>,
    pub missing_positions: Vec<i32>,
    /// `(position, episode_id)` of chapters whose episode id is lower than
    /// that of an earlier chapter
    pub episode_inversions: Vec<(i32, i64)>,
}

impl OrderReport {
    pub fn is_consistent(&self) -> bool {
        self.is_dense && self.episode_inversions.is_empty()
    }
}

/// Inspect the order of `chapters` (sorted by position).
pub fn verify_order(chapters: &[Chapter]) -> OrderReport {
    let mut seen: BTreeMap<i32, usize> = BTreeMap::new();
    for chapter in chapters {
        *seen.entry(chapter.position).or_default() += 1;
    }

    let duplicate_positions: Vec<i32> = seen
        .iter()
        .filter(|(_, count)| **count > 1)
        .map(|(pos, _)| *pos)
        .collect();

    let missing_positions: Vec<i32> = (0..chapters.len() as i32)
        .filter(|pos| !seen.contains_key(pos))
        .collect();

    let mut episode_inversions = Vec::new();
    let mut highest: Option<i64> = None;
    for chapter in chapters {
        if let Some(ep) = chapter.episode_id() {
            match highest {
                Some(max) if ep < max => episode_inversions.push((chapter.position, ep)),
                _ => highest = Some(ep),
            }
        }
    }

    OrderReport {
        chapter_count: chapters.len(),
        is_dense: duplicate_positions.is_empty() && missing_positions.is_empty(),
        duplicate_positions,
        missing_positions,
        episode_inversions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: i32, position: i32, url: Option<&str>, number: Option<&str>) -> Chapter {
        let mut new = NewChapter::new(format!("ch-{}", id));
        new.source_url = url.map(str::to_string);
        new.chapter_number = number.map(str::to_string);
        Chapter::from_new(id, 1, &new, position)
    }

    fn viewer(ep: i64) -> String {
        format!("https://series.example.com/novel/9/viewer/{}", ep)
    }

    #[test]
    fn test_temporary_positions_round_trip() {
        for p in [0, 1, 7, 999, 5000] {
            let temp = temporary_position(p);
            assert!(temp < 0);
            assert_eq!(recover_position(temp), p);
        }
    }

    #[test]
    fn test_episode_id_places_between_neighbours() {
        let existing = vec![
            chapter(1, 0, Some(&viewer(10)), None),
            chapter(2, 1, Some(&viewer(30)), None),
            chapter(3, 2, Some(&viewer(50)), None),
        ];
        let new = NewChapter::new("new").with_source_url(viewer(25));

        let (index, strategy) = resolve_insert_position(&existing, &new).unwrap();
        assert_eq!(index, 1);
        assert_eq!(strategy, PlacementStrategy::EpisodeId);
    }

    #[test]
    fn test_episode_id_skips_chapters_without_id() {
        let existing = vec![
            chapter(1, 0, Some(&viewer(10)), None),
            chapter(2, 1, None, Some("2")),
            chapter(3, 2, Some(&viewer(30)), None),
        ];
        let new = NewChapter::new("new").with_source_url(viewer(20));

        let (index, _) = resolve_insert_position(&existing, &new).unwrap();
        assert_eq!(index, 2);
    }

    #[test]
    fn test_equal_keys_land_after() {
        let existing = vec![
            chapter(1, 0, None, Some("1")),
            chapter(2, 1, None, Some("2")),
        ];
        let new = NewChapter::new("dup").with_chapter_number("1");

        let (index, strategy) = resolve_insert_position(&existing, &new).unwrap();
        assert_eq!(index, 1);
        assert_eq!(strategy, PlacementStrategy::ChapterNumber);
    }

    #[test]
    fn test_bonus_chapters_rank_last() {
        let existing = vec![
            chapter(1, 0, None, Some("1")),
            chapter(2, 1, None, Some("2")),
            chapter(3, 2, None, Some("BONUS")),
        ];

        let mid = NewChapter::new("a").with_chapter_number("1.5");
        let late = NewChapter::new("b").with_chapter_number("5");
        let unnumbered = NewChapter::new("c");

        assert_eq!(resolve_insert_position(&existing, &mid).unwrap().0, 1);
        assert_eq!(resolve_insert_position(&existing, &late).unwrap().0, 2);
        assert_eq!(resolve_insert_position(&existing, &unnumbered).unwrap().0, 3);
    }

    #[test]
    fn test_explicit_position_is_clamped_and_validated() {
        let existing = vec![chapter(1, 0, None, Some("1"))];

        let far = NewChapter::new("far").at_position(40);
        assert_eq!(
            resolve_insert_position(&existing, &far).unwrap(),
            (1, PlacementStrategy::Explicit)
        );

        let negative = NewChapter::new("neg").at_position(-1);
        assert!(matches!(
            resolve_insert_position(&existing, &negative),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_shift_plan_moves_tail_only() {
        let existing = vec![
            chapter(10, 0, None, None),
            chapter(11, 1, None, None),
            chapter(12, 2, None, None),
        ];

        let plan = ShiftPlan::open_gap_at(&existing, 1).unwrap();
        assert_eq!(plan.park, vec![(11, -1001), (12, -1002)]);
        assert_eq!(plan.settle, vec![(11, 2), (12, 3)]);
        assert!(ShiftPlan::open_gap_at(&existing, 3).is_none());
    }

    #[test]
    fn test_compaction_closes_gaps() {
        let chapters = vec![
            chapter(1, 0, None, None),
            chapter(2, 2, None, None),
            chapter(3, 3, None, None),
        ];

        assert_eq!(compaction_moves(&chapters), vec![(2, 1), (3, 2)]);
        assert!(compaction_moves(&chapters[..1]).is_empty());
    }

    #[test]
    fn test_verify_order_flags_gaps_and_inversions() {
        let chapters = vec![
            chapter(1, 0, Some(&viewer(10)), None),
            chapter(2, 2, Some(&viewer(5)), None),
        ];

        let report = verify_order(&chapters);
        assert!(!report.is_dense);
        assert_eq!(report.missing_positions, vec![1]);
        assert_eq!(report.episode_inversions, vec![(2, 5)]);
        assert!(!report.is_consistent());

        assert!(verify_order(&[]).is_consistent());
    }
}
