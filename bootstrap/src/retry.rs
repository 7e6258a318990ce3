//! 启动期重试
//!
//! 只用于启动时探测数据库，请求路径上不重试。

use std::fmt::Display;
use std::future::Future;
use std::iter;
use std::time::Duration;

use tracing::{info, warn};

/// 指数退避参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// 总尝试次数，0 按 1 处理
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// 每次失败后的等待时间，逐次翻倍并封顶
    pub fn backoff(&self) -> impl Iterator<Item = Duration> + use<> {
        let cap = self.max_delay;
        iter::successors(Some(self.initial_delay.min(cap)), move |delay| {
            Some(delay.saturating_mul(2).min(cap))
        })
        .take(self.max_attempts.max(1) as usize - 1)
    }
}

/// 重试直到成功或用尽次数，返回最后一次错误
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, what: &str, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut delays = config.backoff();
    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(what, attempt, "Succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        let Some(delay) = delays.next() else {
            warn!(what, attempt, error = %err, "Giving up");
            return Err(err);
        };

        warn!(
            what,
            attempt,
            error = %err,
            retry_in_ms = delay.as_millis() as u64,
            "Attempt failed"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

/// 失败时返回 None，调用方降级继续
pub async fn with_retry_optional<F, Fut, T, E>(
    config: &RetryConfig,
    what: &str,
    operation: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    with_retry(config, what, operation).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let delays: Vec<_> = RetryConfig::new(6, 500, 3000).backoff().collect();
        assert_eq!(
            delays,
            [500, 1000, 2000, 3000, 3000].map(Duration::from_millis).to_vec()
        );
        assert_eq!(RetryConfig::new(0, 10, 10).backoff().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_on_third_attempt() {
        let calls = Cell::new(0);
        let result = with_retry(&RetryConfig::new(3, 10, 100), "probe", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { if n < 3 { Err("connection refused") } else { Ok(n) } }
        })
        .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_optional_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Option<()> = with_retry_optional(&RetryConfig::new(2, 10, 100), "probe", || {
            calls.set(calls.get() + 1);
            async { Err("connection refused") }
        })
        .await;

        assert!(result.is_none());
        assert_eq!(calls.get(), 2);
    }
}
