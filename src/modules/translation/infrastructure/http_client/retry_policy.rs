//! Retry policies for translation provider calls
//!
//! Provider calls are slow and expensive, so retries are few and spaced out.
//! Server-provided delays (`Retry-After`, `X-RateLimit-Reset`) win over backoff.

use std::time::Duration;

/// Configuration for HTTP retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Cap for both backoff and server-provided delays
    pub max_delay: Duration,
    pub exponential_backoff: bool,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    /// Chat-completion providers (OpenRouter, OpenAI, Google)
    pub fn translation() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            exponential_backoff: true,
            backoff_multiplier: 2.0,
        }
    }

    /// DeepL answers quickly and throttles hard, so retry more often with shorter waits
    pub fn machine_translation() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            exponential_backoff: true,
            backoff_multiplier: 2.0,
        }
    }

    /// No retries at all
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            exponential_backoff: false,
            backoff_multiplier: 1.0,
        }
    }

    pub fn calculate_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(server_delay) = retry_after {
            return server_delay.min(self.max_delay);
        }

        let delay = if self.exponential_backoff {
            let multiplier = self.backoff_multiplier.powi(attempt as i32);
            Duration::from_millis((self.base_delay.as_millis() as f64 * multiplier) as u64)
        } else {
            self.base_delay
        };

        delay.min(self.max_delay)
    }
}

/// Rate limit hints from an HTTP 429 response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitInfo {
    pub retry_after: Option<Duration>,
    /// Time until `X-RateLimit-Reset`
    pub reset_time: Option<Duration>,
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let header = |name: &str| headers.get(name).and_then(|h| h.to_str().ok());

        let retry_after = header("retry-after")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs);

        let reset_time = header("x-ratelimit-reset")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|timestamp| {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_secs();
                Duration::from_secs(timestamp.saturating_sub(now))
            });

        Self {
            retry_after,
            reset_time,
            remaining: header("x-ratelimit-remaining").and_then(|s| s.trim().parse().ok()),
            limit: header("x-ratelimit-limit").and_then(|s| s.trim().parse().ok()),
        }
    }

    pub fn recommended_delay(&self) -> Option<Duration> {
        self.retry_after.or(self.reset_time)
    }
}

/// Transport failures worth another attempt
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if let Some(status) = error.status() {
        is_retryable_status(status.as_u16())
    } else {
        error.is_timeout() || error.is_connect()
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 425 | 429 | 500..=599)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_policy() {
        let policy = RetryPolicy::translation();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.calculate_delay(0, None), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(1, None), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(10, None), Duration::from_secs(60));
    }

    #[test]
    fn test_server_delay_is_capped() {
        let policy = RetryPolicy::machine_translation();
        assert_eq!(
            policy.calculate_delay(0, Some(Duration::from_secs(5))),
            Duration::from_secs(5)
        );
        assert_eq!(
            policy.calculate_delay(0, Some(Duration::from_secs(600))),
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_rate_limit_info_parsing() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "30".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "0".parse().unwrap());
        headers.insert("x-ratelimit-limit", "90".parse().unwrap());

        let info = RateLimitInfo::from_headers(&headers);
        assert_eq!(info.retry_after, Some(Duration::from_secs(30)));
        assert_eq!(info.remaining, Some(0));
        assert_eq!(info.limit, Some(90));
        assert_eq!(info.recommended_delay(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(401));
    }
}
