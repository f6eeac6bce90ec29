use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Sortable key derived from a chapter's `chapter_number` label.
///
/// Missing, bonus and unparsable labels all collapse onto [`ChapterRank::SENTINEL`],
/// so they sort after every numbered chapter and keep their relative order
/// under a stable sort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChapterRank(f64);

impl ChapterRank {
    pub const SENTINEL_VALUE: f64 = 999_999.0;
    pub const SENTINEL: ChapterRank = ChapterRank(Self::SENTINEL_VALUE);
    pub const BONUS_MARKER: &'static str = "BONUS";

    /// Parse a chapter label. Never fails.
    pub fn parse(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::SENTINEL;
        };

        let trimmed = label.trim();
        if trimmed.is_empty() || trimmed == Self::BONUS_MARKER {
            return Self::SENTINEL;
        }

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => ChapterRank(value),
            _ => Self::SENTINEL,
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == Self::SENTINEL_VALUE
    }
}

// Ranks are always finite, so the partial order is total.
impl Eq for ChapterRank {}

impl PartialOrd for ChapterRank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChapterRank {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for ChapterRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            write!(f, "last")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
