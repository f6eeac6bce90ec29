pub mod jobs;
pub mod novel;
pub mod translation;
