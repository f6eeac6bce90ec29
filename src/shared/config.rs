/// Environment-driven configuration
///
/// Values come from the process environment after `.env` has been loaded with
/// `dotenvy`. Every field has a default so a worker can start with only
/// `DATABASE_URL` and one provider key set.
use crate::shared::domain::TranslationProvider;
use crate::shared::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Static configuration consumed by the job runtime.
///
/// Payloads are always JSON and timestamps UTC; those are properties of the
/// queue table rather than knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct JobQueueConfig {
    /// Hard limit for a single job; the worker abandons the job after it
    pub task_time_limit: Duration,
    /// Soft limit; used as the HTTP timeout of provider calls
    pub task_soft_time_limit: Duration,
    /// How long an idle worker sleeps between polls
    pub poll_interval: Duration,
    /// Attempts before a job is marked permanently failed
    pub max_attempts: i32,
    /// Persist "started" progress for running jobs
    pub track_started: bool,
    /// Keep retrying the database connection when the worker boots
    pub connection_retry_on_startup: bool,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            task_time_limit: Duration::from_secs(300),
            task_soft_time_limit: Duration::from_secs(240),
            poll_interval: Duration::from_secs(5),
            max_attempts: 3,
            track_started: true,
            connection_retry_on_startup: true,
        }
    }
}

impl JobQueueConfig {
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        let task_time_limit = read_secs("JOB_TASK_TIME_LIMIT_SECS", defaults.task_time_limit)?;
        let task_soft_time_limit =
            read_secs("JOB_SOFT_TIME_LIMIT_SECS", defaults.task_soft_time_limit)?;

        if task_soft_time_limit > task_time_limit {
            return Err(AppError::ValidationError(format!(
                "Soft time limit ({:?}) must not exceed hard time limit ({:?})",
                task_soft_time_limit, task_time_limit
            )));
        }

        let max_attempts = match env::var("JOB_MAX_ATTEMPTS") {
            Ok(raw) => raw.trim().parse::<i32>().map_err(|e| {
                AppError::InvalidInput(format!("JOB_MAX_ATTEMPTS must be an integer: {}", e))
            })?,
            Err(_) => defaults.max_attempts,
        };

        if max_attempts < 1 {
            return Err(AppError::ValidationError(
                "JOB_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            task_time_limit,
            task_soft_time_limit,
            poll_interval: read_secs("JOB_POLL_INTERVAL_SECS", defaults.poll_interval)?,
            max_attempts,
            track_started: read_bool("JOB_TRACK_STARTED", defaults.track_started),
            connection_retry_on_startup: read_bool(
                "JOB_CONNECTION_RETRY_ON_STARTUP",
                defaults.connection_retry_on_startup,
            ),
        })
    }
}

/// Credentials and model for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub api_key: String,
    pub model: String,
}

/// Which translation provider to call and how
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationConfig {
    pub selected_provider: TranslationProvider,
    pub providers: HashMap<TranslationProvider, ProviderSettings>,
    pub custom_prompt_suffix: Option<String>,
    pub request_timeout: Duration,
}

impl TranslationConfig {
    pub fn from_env(request_timeout: Duration) -> AppResult<Self> {
        let selected_provider = match env::var("TRANSLATION_PROVIDER") {
            Ok(raw) => raw
                .parse::<TranslationProvider>()
                .map_err(AppError::InvalidInput)?,
            Err(_) => TranslationProvider::default(),
        };

        let mut providers = HashMap::new();
        for provider in TranslationProvider::ALL {
            let key_var = format!("{}_API_KEY", provider.env_prefix());
            let Ok(api_key) = env::var(&key_var) else {
                continue;
            };
            if api_key.trim().is_empty() {
                continue;
            }

            let model = env::var(format!("{}_MODEL", provider.env_prefix()))
                .ok()
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| provider.default_model().to_string());

            providers.insert(
                provider,
                ProviderSettings {
                    api_key: api_key.trim().to_string(),
                    model,
                },
            );
        }

        let custom_prompt_suffix = env::var("CUSTOM_PROMPT_SUFFIX")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            selected_provider,
            providers,
            custom_prompt_suffix,
            request_timeout,
        })
    }

    /// Settings of the selected provider; a missing key is reported the way the
    /// translation task reports it ("No API key configured").
    pub fn active_settings(&self) -> AppResult<&ProviderSettings> {
        self.providers.get(&self.selected_provider).ok_or_else(|| {
            AppError::Unauthorized(format!(
                "No API key configured for {}",
                self.selected_provider.display_name()
            ))
        })
    }
}

/// Top-level configuration of the worker process
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jobs: JobQueueConfig,
    pub translation: TranslationConfig,
}

impl AppConfig {
    /// Load `.env` (if present) and read the whole configuration.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").map_err(|_| {
            AppError::DatabaseError("DATABASE_URL environment variable not found".to_string())
        })?;

        let jobs = JobQueueConfig::from_env()?;
        let translation = TranslationConfig::from_env(jobs.task_soft_time_limit)?;

        Ok(Self {
            database_url,
            jobs,
            translation,
        })
    }
}

fn read_secs(var: &str, default: Duration) -> AppResult<Duration> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| AppError::InvalidInput(format!("{} must be whole seconds: {}", var, e))),
        Err(_) => Ok(default),
    }
}

fn read_bool(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(raw) => matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}
