/// Shared application layer patterns
///
/// This module contains application-level abstractions used across
/// multiple bounded contexts.
pub mod progress;
pub mod use_case;

pub use progress::{NoopProgress, ProgressReporter};
pub use use_case::UseCase;
