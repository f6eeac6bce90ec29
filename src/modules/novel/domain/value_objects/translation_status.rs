use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a chapter translation, owned by the translation task.
#[derive(
    diesel_derive_enum::DbEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::TranslationStatus"]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// Not started yet
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl Default for TranslationStatus {
    fn default() -> Self {
        TranslationStatus::Pending
    }
}

impl TranslationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TranslationStatus::Completed | TranslationStatus::Failed)
    }
}

impl fmt::Display for TranslationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslationStatus::Pending => write!(f, "pending"),
            TranslationStatus::InProgress => write!(f, "in_progress"),
            TranslationStatus::Completed => write!(f, "completed"),
            TranslationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for TranslationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" | "not_started" => Ok(TranslationStatus::Pending),
            "in_progress" => Ok(TranslationStatus::InProgress),
            "completed" => Ok(TranslationStatus::Completed),
            "failed" => Ok(TranslationStatus::Failed),
            _ => Err(format!("Invalid translation status: {}", s)),
        }
    }
}
