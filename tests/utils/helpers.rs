/// Test helper functions and service builders
use async_trait::async_trait;
use lunafrost_lib::modules::{
    jobs::{BackgroundWorker, InMemoryJobRepository},
    novel::{InMemoryNovelRepository, MemoryDatabase, NovelRepository, NovelService},
    translation::{
        InMemoryTokenUsageRepository, TokenCounts, TokenUsageRepository, TranslationOutput,
        TranslationRequest, TranslationService, Translator,
    },
};
use lunafrost_lib::shared::application::ProgressReporter;
use lunafrost_lib::shared::{JobQueueConfig, TranslationProvider};
use lunafrost_lib::{AppError, AppResult};
use mockall::mock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const TEST_MODEL: &str = "gpt-4o-mini";

mock! {
    pub Translator {}

    #[async_trait]
    impl Translator for Translator {
        fn provider(&self) -> TranslationProvider;
        fn model(&self) -> String;
        async fn translate(&self, request: &TranslationRequest) -> AppResult<TranslationOutput>;
    }
}

/// Echoes `EN: <text>` and reports token usage on every call
pub fn echo_translator() -> MockTranslator {
    let mut translator = base_translator();
    translator
        .expect_translate()
        .returning(|request: &TranslationRequest| Ok(echo(request)));
    translator
}

/// Fails every call with the error built by `error`
pub fn failing_translator(error: fn() -> AppError) -> MockTranslator {
    let mut translator = base_translator();
    translator.expect_translate().returning(move |_| Err(error()));
    translator
}

pub fn base_translator() -> MockTranslator {
    let mut translator = MockTranslator::new();
    translator
        .expect_provider()
        .return_const(TranslationProvider::OpenAi);
    translator
        .expect_model()
        .returning(|| TEST_MODEL.to_string());
    translator
}

pub fn echo(request: &TranslationRequest) -> TranslationOutput {
    TranslationOutput {
        text: format!("EN: {}", request.text),
        token_usage: Some(TokenCounts {
            provider: TranslationProvider::OpenAi,
            model: TEST_MODEL.to_string(),
            input_tokens: 10,
            output_tokens: 20,
            total_tokens: 30,
        }),
    }
}

/// Never answers within a test time limit
pub struct StalledTranslator;

#[async_trait]
impl Translator for StalledTranslator {
    fn provider(&self) -> TranslationProvider {
        TranslationProvider::OpenAi
    }

    fn model(&self) -> String {
        TEST_MODEL.to_string()
    }

    async fn translate(&self, _request: &TranslationRequest) -> AppResult<TranslationOutput> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(AppError::Timeout("stalled".to_string()))
    }
}

/// Collects progress messages
#[derive(Default)]
pub struct RecordingProgress {
    messages: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressReporter for RecordingProgress {
    async fn report(&self, status: &str) {
        self.messages.lock().unwrap().push(status.to_string());
    }
}

pub struct TestServices {
    pub novel_service: Arc<NovelService>,
    pub novel_repository: Arc<dyn NovelRepository>,
    pub usage_repository: Arc<dyn TokenUsageRepository>,
    pub translation_service: Arc<TranslationService>,
    pub job_repository: Arc<InMemoryJobRepository>,
    pub background_worker: Arc<BackgroundWorker>,
}

pub fn with_translator(translator: impl Translator + 'static) -> Option<Arc<dyn Translator>> {
    Some(Arc::new(translator))
}

/// In-memory services; `None` behaves like a worker without an API key
pub fn build_test_services(translator: Option<Arc<dyn Translator>>) -> TestServices {
    build_test_services_with_config(translator, test_queue_config())
}

pub fn build_test_services_with_config(
    translator: Option<Arc<dyn Translator>>,
    config: JobQueueConfig,
) -> TestServices {
    let db = MemoryDatabase::new();
    let novel_repository: Arc<dyn NovelRepository> =
        Arc::new(InMemoryNovelRepository::new(Arc::clone(&db)));
    let usage_repository: Arc<dyn TokenUsageRepository> =
        Arc::new(InMemoryTokenUsageRepository::new(db));

    let translation_service = Arc::new(TranslationService::new(
        Arc::clone(&novel_repository),
        Arc::clone(&usage_repository),
        translator,
        None,
    ));

    let job_repository = Arc::new(InMemoryJobRepository::new());
    let background_worker = Arc::new(BackgroundWorker::new(
        job_repository.clone(),
        Arc::clone(&translation_service),
        config,
    ));

    TestServices {
        novel_service: Arc::new(NovelService::new(Arc::clone(&novel_repository))),
        novel_repository,
        usage_repository,
        translation_service,
        job_repository,
        background_worker,
    }
}

pub fn test_queue_config() -> JobQueueConfig {
    JobQueueConfig {
        task_time_limit: Duration::from_secs(5),
        task_soft_time_limit: Duration::from_secs(4),
        poll_interval: Duration::from_millis(20),
        ..JobQueueConfig::default()
    }
}

/// Drain the queue synchronously; returns how many jobs ran
pub async fn drain_queue(worker: &BackgroundWorker) -> usize {
    let mut processed = 0;
    while worker.process_next_job().await.expect("worker step failed") {
        processed += 1;
    }
    processed
}
