pub mod logger;
pub mod slug;

pub use logger::{init_logger, LogContext, TimedOperation};
pub use slug::slugify_english;
