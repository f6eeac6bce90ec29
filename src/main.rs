use anyhow::Context;
use lunafrost_lib::{log_info, log_warn};
use lunafrost_lib::modules::jobs::{BackgroundWorker, JobRepositoryImpl};
use lunafrost_lib::modules::novel::NovelRepositoryImpl;
use lunafrost_lib::modules::translation::{TokenUsageRepositoryImpl, TranslationService};
use lunafrost_lib::shared::utils::init_logger;
use lunafrost_lib::shared::{AppConfig, Database};
use std::sync::Arc;
use std::time::Duration;

/// Backoff ceiling between startup connection attempts
const MAX_CONNECT_BACKOFF: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let database = Arc::new(connect(&config).await?);

    let migrations_db = Arc::clone(&database);
    tokio::task::spawn_blocking(move || migrations_db.run_migrations())
        .await?
        .context("Failed to run database migrations")?;
    log_info!("Database pool ready: {:?}", database.pool_status());

    let novel_repo = Arc::new(NovelRepositoryImpl::new(Arc::clone(&database)));
    let usage_repo = Arc::new(TokenUsageRepositoryImpl::new(Arc::clone(&database)));
    let job_repository = Arc::new(JobRepositoryImpl::new(Arc::clone(&database)));

    let translation_service = Arc::new(
        TranslationService::from_config(&config.translation, novel_repo, usage_repo)
            .context("Failed to initialize translation service")?,
    );

    let worker = Arc::new(BackgroundWorker::new(
        job_repository,
        translation_service,
        config.jobs.clone(),
    ));

    let handle = tokio::spawn(Arc::clone(&worker).run());
    log_info!(
        "Worker running with provider {}",
        config.translation.selected_provider
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    log_info!("Shutdown signal received, finishing current job");

    worker.stop().await;
    handle.await?;

    Ok(())
}

/// Open the pool, retrying with exponential backoff when configured to
async fn connect(config: &AppConfig) -> anyhow::Result<Database> {
    let mut attempt: u32 = 0;

    loop {
        let url = config.database_url.clone();
        match tokio::task::spawn_blocking(move || Database::new(&url)).await? {
            Ok(database) => {
                if attempt > 0 {
                    log_info!("Database connection established after {} retries", attempt);
                }
                return Ok(database);
            }
            Err(e) if config.jobs.connection_retry_on_startup => {
                let backoff = Duration::from_secs(2_u64.saturating_pow(attempt.min(16)))
                    .min(MAX_CONNECT_BACKOFF);
                attempt += 1;
                log_warn!(
                    "Database connection attempt {} failed: {}. Retrying in {:?}",
                    attempt,
                    e,
                    backoff
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => return Err(e).context("Failed to connect to database"),
        }
    }
}
