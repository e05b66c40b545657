//! Retry utilities with exponential backoff for resilient API calls.

use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_delay: Duration,
    /// Upper bound for the exponential delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Minimum delay after the provider blocked the request (CAPTCHA)
    pub blocked_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            blocked_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Backoff delay after the given failed attempt (1-based).
    ///
    /// `initial_delay * multiplier^(attempt - 1)`, capped at `max_delay`.
    /// Non-decreasing in `attempt` for multipliers >= 1.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_multiplier.max(1.0).powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, PartialEq)]
pub enum TransientError {
    /// Network connectivity issues
    Network,
    /// Request timeout
    Timeout,
    /// Server error (5xx)
    ServerError(u16),
    /// Provider refused automated traffic for now
    Blocked,
    /// Too many requests (429) with the advertised retry-after seconds
    TooManyRequests(u64),
}

impl TransientError {
    /// Classify a SourceError; `None` means the error is permanent
    pub fn from_source_error(err: &SourceError) -> Option<Self> {
        match err {
            SourceError::Network(_) => Some(TransientError::Network),
            SourceError::Timeout { .. } => Some(TransientError::Timeout),
            SourceError::Blocked { .. } => Some(TransientError::Blocked),
            SourceError::RateLimit { retry_after, .. } => {
                Some(TransientError::TooManyRequests(*retry_after))
            }
            SourceError::ExternalService {
                status_code: Some(status),
                ..
            } if *status >= 500 => Some(TransientError::ServerError(*status)),
            _ => None,
        }
    }

    /// Delay before the next attempt, or `None` when retrying is pointless
    ///
    /// A 429 whose retry-after exceeds `max_delay` is surfaced instead of
    /// waited out.
    pub fn next_delay(&self, config: &RetryConfig, attempt: u32) -> Option<Duration> {
        let backoff = config.delay_for_attempt(attempt);
        match self {
            TransientError::Blocked => Some(backoff.max(config.blocked_delay)),
            TransientError::TooManyRequests(secs) => {
                let advertised = Duration::from_secs(*secs);
                (advertised <= config.max_delay).then(|| backoff.max(advertised))
            }
            _ => Some(backoff),
        }
    }
}

/// Execute an async operation with retry logic
///
/// # Arguments
///
/// * `config` - Retry configuration
/// * `operation` - The async operation to execute
///
/// # Returns
///
/// The result of the operation, or the last error after all attempts are
/// exhausted. Permanent errors are returned immediately.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;
    let mut operation = operation;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(
                        "Operation succeeded on attempt {} after {} transient failures",
                        attempts,
                        attempts - 1
                    );
                }
                return Ok(result);
            }
            Err(error) => {
                let Some(transient) = TransientError::from_source_error(&error) else {
                    return Err(error);
                };

                if attempts >= config.max_attempts.max(1) {
                    tracing::warn!("Operation failed after {} attempts: {}", attempts, error);
                    return Err(error);
                }

                let Some(delay) = transient.next_delay(&config, attempts) else {
                    tracing::debug!("Not retrying {:?}: retry-after exceeds backoff budget", transient);
                    return Err(error);
                };

                tracing::debug!(
                    "Transient error on attempt {}: {:?}, retrying in {:?}",
                    attempts,
                    transient,
                    delay
                );
                sleep(delay).await;
            }
        }
    }
}

/// Retry configuration for the public JSON APIs
pub fn api_retry_config() -> RetryConfig {
    RetryConfig::default()
}

/// Retry configuration for sources that block scrapers aggressively
pub fn strict_rate_limit_retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_secs(2),
        max_delay: Duration::from_secs(60),
        backoff_multiplier: 2.0,
        blocked_delay: Duration::from_secs(5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tokio::time::Instant;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 4,
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            blocked_delay: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_try() {
        let call_count = Rc::new(RefCell::new(0));

        let result = {
            let call_count = call_count.clone();
            with_retry(RetryConfig::default(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Ok("success")
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_on_third_attempt_with_growing_delay() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(150),
            backoff_multiplier: 2.0,
            blocked_delay: Duration::from_secs(1),
        };
        let calls: Rc<RefCell<Vec<Instant>>> = Rc::new(RefCell::new(Vec::new()));

        let result = {
            let calls = calls.clone();
            with_retry(config, move || {
                let calls = calls.clone();
                async move {
                    calls.borrow_mut().push(Instant::now());
                    if calls.borrow().len() < 3 {
                        Err(SourceError::Timeout {
                            service: "test".into(),
                            timeout: Duration::from_secs(1),
                        })
                    } else {
                        Ok("success")
                    }
                }
            })
        }
        .await;

        assert_eq!(result.unwrap(), "success");
        let calls = calls.borrow();
        assert_eq!(calls.len(), 3);
        let first_gap = calls[1] - calls[0];
        let second_gap = calls[2] - calls[1];
        assert!(second_gap >= first_gap);
        assert!(second_gap <= config.max_delay + Duration::from_millis(1));
        assert!(first_gap >= config.initial_delay);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error_when_exhausted() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<(), SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::Network(format!(
                        "attempt {}",
                        call_count.borrow()
                    )))
                }
            })
        }
        .await;

        assert_eq!(result.unwrap_err(), SourceError::Network("attempt 4".into()));
        assert_eq!(*call_count.borrow(), 4);
    }

    #[tokio::test]
    async fn test_retry_returns_permanent_error() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<&str, SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::ExternalService {
                        service: "test".into(),
                        message: "Client error: HTTP 400".into(),
                        status_code: Some(400),
                    })
                }
            })
        }
        .await;

        assert!(matches!(
            result,
            Err(SourceError::ExternalService {
                status_code: Some(400),
                ..
            })
        ));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[tokio::test]
    async fn test_long_retry_after_is_surfaced() {
        let call_count = Rc::new(RefCell::new(0));

        let result: Result<(), SourceError> = {
            let call_count = call_count.clone();
            with_retry(fast_config(), move || {
                let call_count = call_count.clone();
                async move {
                    *call_count.borrow_mut() += 1;
                    Err(SourceError::RateLimit {
                        service: "test".into(),
                        retry_after: 60,
                    })
                }
            })
        }
        .await;

        assert_eq!(result.unwrap_err().retry_after(), Some(60));
        assert_eq!(*call_count.borrow(), 1);
    }

    #[test]
    fn test_delay_for_attempt_is_monotonic_and_capped() {
        let config = fast_config();
        let delays: Vec<Duration> = (1..=8).map(|a| config.delay_for_attempt(a)).collect();
        assert_eq!(delays[0], Duration::from_millis(10));
        assert_eq!(delays[1], Duration::from_millis(20));
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert!(delays.iter().all(|d| *d <= config.max_delay));
        assert_eq!(delays[7], config.max_delay);
    }

    #[test]
    fn test_blocked_uses_longer_delay() {
        let config = fast_config();
        assert_eq!(
            TransientError::Blocked.next_delay(&config, 1),
            Some(config.blocked_delay)
        );
        assert_eq!(
            TransientError::Network.next_delay(&config, 1),
            Some(config.initial_delay)
        );
    }

    #[test]
    fn test_transient_error_detection() {
        let network_error = SourceError::Network("connection refused".to_string());
        assert_eq!(
            TransientError::from_source_error(&network_error),
            Some(TransientError::Network)
        );

        let server_error = SourceError::ExternalService {
            service: "web".into(),
            message: "HTTP 503".into(),
            status_code: Some(503),
        };
        assert_eq!(
            TransientError::from_source_error(&server_error),
            Some(TransientError::ServerError(503))
        );

        let parse_error = SourceError::Parse("invalid json".to_string());
        assert!(TransientError::from_source_error(&parse_error).is_none());
    }
}
