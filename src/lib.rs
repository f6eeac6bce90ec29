//! Background job layer for novel translation.
//!
//! * [`modules::novel`]: novels, chapters and the ordered chapter inserter
//! * [`modules::translation`]: provider calls, prompts and token usage
//! * [`modules::jobs`]: the Postgres job queue and its worker
pub mod modules;
mod schema;
pub mod shared;

pub use shared::errors::{AppError, AppResult};
