use async_trait::async_trait;

/// Sink for human-readable progress messages of a long-running task.
///
/// The job worker persists them on the job row; direct callers can pass [`NoopProgress`].
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn report(&self, status: &str);
}

pub struct NoopProgress;

#[async_trait]
impl ProgressReporter for NoopProgress {
    async fn report(&self, _status: &str) {}
}
