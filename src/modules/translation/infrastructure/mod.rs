pub mod http_client;
pub mod http_translator;
pub mod memory;
pub mod models;
pub mod repository;

pub use http_client::{RateLimitClient, RetryPolicy};
pub use http_translator::HttpTranslator;
pub use memory::InMemoryTokenUsageRepository;
pub use repository::TokenUsageRepositoryImpl;
