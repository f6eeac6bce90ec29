use crate::shared::errors::AppResult;
/// Base trait for all use cases following CQRS pattern
///
/// This trait provides a standard interface for command/query handlers
/// following the Single Responsibility Principle.
///
/// # Example
///
/// ```rust,ignore
/// struct AddChapterCommand {
///     user_id: String,
///     novel_slug: String,
///     chapter: NewChapter,
/// }
///
/// struct AddChapterHandler {
///     repository: Arc<dyn NovelRepository>,
/// }
///
/// #[async_trait]
/// impl UseCase<AddChapterCommand, InsertChapterResult> for AddChapterHandler {
///     async fn execute(&self, command: AddChapterCommand) -> AppResult<InsertChapterResult> {
///         // Use case logic here
///     }
/// }
/// ```
use async_trait::async_trait;

/// Base trait for use cases (command handlers)
#[async_trait]
pub trait UseCase<TCommand, TResult> {
    /// Execute the use case with the given command
    async fn execute(&self, command: TCommand) -> AppResult<TResult>;
}
