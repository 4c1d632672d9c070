use crate::error::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub enum RetryStrategy {
    None,
    Linear { max_attempts: u32, delay_ms: u64 },
    Exponential { max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64 },
}

/// Retry executor for recoverable operations. Unrecoverable errors (see
/// `ScanError::is_recoverable`) are returned immediately.
pub struct RetryExecutor {
    strategy: RetryStrategy,
}

impl RetryExecutor {
    pub fn new(strategy: RetryStrategy) -> Self {
        Self { strategy }
    }

    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        match &self.strategy {
            RetryStrategy::None => operation().await,
            RetryStrategy::Linear { max_attempts, delay_ms } => {
                self.execute_with_delays(operation, *max_attempts, *delay_ms, None).await
            }
            RetryStrategy::Exponential { max_attempts, base_delay_ms, max_delay_ms } => {
                self.execute_with_delays(operation, *max_attempts, *base_delay_ms, Some(*max_delay_ms))
                    .await
            }
        }
    }

    async fn execute_with_delays<F, Fut, T>(
        &self,
        operation: F,
        max_attempts: u32,
        initial_delay_ms: u64,
        exponential_cap_ms: Option<u64>,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = initial_delay_ms;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            debug!("Attempt {} of {}", attempt, max_attempts);

            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if !err.is_recoverable() || attempt == max_attempts {
                        return Err(err);
                    }

                    warn!("Attempt {} failed: {}, retrying in {}ms", attempt, err, delay);
                    last_error = Some(err);
                    sleep(Duration::from_millis(delay)).await;

                    if let Some(cap) = exponential_cap_ms {
                        delay = std::cmp::min(delay * 2, cap);
                    }
                }
            }
        }

        Err(last_error.unwrap())
    }
}

/// Convenience wrapper for short transient-failure windows in network calls.
pub async fn retry_with_linear_backoff<F, Fut, T>(
    operation: F,
    max_attempts: u32,
    delay_ms: u64,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    RetryExecutor::new(RetryStrategy::Linear { max_attempts, delay_ms })
        .execute(operation)
        .await
}
