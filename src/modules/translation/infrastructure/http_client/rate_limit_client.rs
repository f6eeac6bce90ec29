//! HTTP client with rate limiting and retries for translation providers
//!
//! One client per provider: each owns its governor quota and retry policy, and
//! applies the configured request timeout to every call.

use super::retry_policy::{is_retryable_error, is_retryable_status, RateLimitInfo, RetryPolicy};
use crate::shared::domain::TranslationProvider;
use crate::shared::errors::{AppError, AppResult};
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{direct::NotKeyed, InMemoryState},
    Quota, RateLimiter as GovernorRateLimiter,
};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::sleep;

type DirectRateLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

const USER_AGENT: &str = concat!("lunafrost/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_PREVIEW: usize = 200;

/// Request headers as name/value pairs
pub type Headers<'a> = &'a [(&'static str, String)];

enum Body<'a> {
    Json(&'a Value),
    Form(&'a [(&'static str, String)]),
}

pub struct RateLimitClient {
    client: Client,
    rate_limiter: DirectRateLimiter,
    retry_policy: RetryPolicy,
    provider_name: String,
}

impl RateLimitClient {
    /// Client tuned for `provider`
    pub fn for_provider(provider: TranslationProvider, timeout: Duration) -> AppResult<Self> {
        let (rate_limiter, retry_policy) = match provider {
            TranslationProvider::OpenRouter => {
                (Self::create_rate_limiter(1.0, 5), RetryPolicy::translation())
            }
            TranslationProvider::OpenAi => {
                (Self::create_rate_limiter(2.0, 5), RetryPolicy::translation())
            }
            TranslationProvider::Google => {
                (Self::create_rate_limiter(1.0, 3), RetryPolicy::translation())
            }
            TranslationProvider::DeepL => (
                Self::create_rate_limiter(2.0, 5),
                RetryPolicy::machine_translation(),
            ),
        };

        Self::new(provider.display_name(), retry_policy, rate_limiter, timeout)
    }

    /// Rate limiter allowing `requests_per_second` on average with `burst_size` bursts
    pub fn create_rate_limiter(requests_per_second: f64, burst_size: u32) -> DirectRateLimiter {
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);

        let quota = if requests_per_second > 0.0 {
            Quota::with_period(Duration::from_secs_f64(1.0 / requests_per_second))
                .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        } else {
            Quota::per_hour(NonZeroU32::MIN)
        };

        GovernorRateLimiter::direct(quota.allow_burst(burst))
    }

    pub fn new(
        provider_name: &str,
        retry_policy: RetryPolicy,
        rate_limiter: DirectRateLimiter,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::InternalError(format!(
                    "Failed to build {} HTTP client: {}",
                    provider_name, e
                ))
            })?;

        Ok(Self {
            client,
            rate_limiter,
            retry_policy,
            provider_name: provider_name.to_string(),
        })
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<T>(&self, url: &str, headers: Headers<'_>, body: &Value) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_retries(url, headers, Body::Json(body)).await
    }

    /// POST a form-encoded body and decode the JSON response
    pub async fn post_form<T>(
        &self,
        url: &str,
        headers: Headers<'_>,
        form: &[(&'static str, String)],
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_retries(url, headers, Body::Form(form))
            .await
    }

    async fn request_with_retries<T>(
        &self,
        url: &str,
        headers: Headers<'_>,
        body: Body<'_>,
    ) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let attempts = self.retry_policy.max_retries + 1;

        for attempt in 0..attempts {
            self.rate_limiter.until_ready().await;
            let is_last = attempt + 1 == attempts;

            let response = match self.build_request(url, headers, &body).send().await {
                Ok(response) => response,
                Err(e) if is_retryable_error(&e) && !is_last => {
                    let delay = self.retry_policy.calculate_delay(attempt, None);
                    tracing::warn!(
                        "{} API request failed (attempt {}/{}): {}. Retrying in {:?}",
                        self.provider_name,
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(self.transport_error(e)),
            };

            let status = response.status();
            if status.is_success() {
                return self.parse_response(response).await;
            }

            if is_retryable_status(status.as_u16()) && !is_last {
                let info = RateLimitInfo::from_headers(response.headers());
                let delay = self
                    .retry_policy
                    .calculate_delay(attempt, info.recommended_delay());
                tracing::warn!(
                    "{} API returned {} (attempt {}/{}). Retrying in {:?}",
                    self.provider_name,
                    status.as_u16(),
                    attempt + 1,
                    attempts,
                    delay
                );
                sleep(delay).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, &body));
        }

        Err(AppError::ApiError(format!(
            "{} API request failed after {} attempts",
            self.provider_name, attempts
        )))
    }

    fn build_request(&self, url: &str, headers: Headers<'_>, body: &Body<'_>) -> RequestBuilder {
        let mut request = self
            .client
            .post(url)
            .header("Accept", "application/json");

        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }

        match body {
            Body::Json(json) => request.json(json),
            Body::Form(form) => request.form(form),
        }
    }

    async fn parse_response<T>(&self, response: Response) -> AppResult<T>
    where
        T: DeserializeOwned,
    {
        let response_text = response.text().await.map_err(|e| {
            AppError::SerializationError(format!(
                "Failed to read {} response: {}",
                self.provider_name, e
            ))
        })?;

        serde_json::from_str(&response_text).map_err(|e| {
            AppError::SerializationError(format!(
                "Failed to parse {} response: {}. Response: {}",
                self.provider_name,
                e,
                preview(&response_text)
            ))
        })
    }

    fn transport_error(&self, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::Timeout(format!("{} API request timed out", self.provider_name))
        } else {
            AppError::ExternalServiceError(format!(
                "{} API request failed: {}",
                self.provider_name, error
            ))
        }
    }

    fn status_error(&self, status: StatusCode, body: &str) -> AppError {
        let message = format!(
            "{} API Error: {} - {}",
            self.provider_name,
            status.as_u16(),
            error_message(body)
        );

        match status.as_u16() {
            401 | 403 => AppError::Unauthorized(message),
            429 => AppError::RateLimitError(message),
            _ => AppError::ApiError(message),
        }
    }

    pub fn can_make_request_now(&self) -> bool {
        self.rate_limiter.check().is_ok()
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }
}

/// Human-readable message from a provider error body.
///
/// Chat APIs nest it under `error.message`, DeepL puts it at `message`.
pub fn error_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let nested = parsed.as_ref().and_then(|v| {
        v.pointer("/error/message")
            .or_else(|| v.get("message"))
            .or_else(|| v.get("error").filter(|e| e.is_string()))
            .and_then(Value::as_str)
    });

    match nested {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "Unknown error".to_string(),
        None => preview(body),
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > ERROR_BODY_PREVIEW {
        let head: String = text.chars().take(ERROR_BODY_PREVIEW).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
