//! Bounded retries with exponential backoff

use std::future::Future;
use std::time::Duration;

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Retry(Duration),
    GiveUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            multiplier: 2,
        }
    }
}

/// The operation failed on every attempt.
#[derive(Debug)]
pub struct Exhausted<E> {
    pub attempts: u32,
    pub error: E,
}

impl RetryPolicy {
    /// Retries without waiting.
    pub fn immediate(max_attempts: u32) -> Self {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            multiplier: 1,
        }
    }

    /// Decision after `attempts` failed attempts.
    pub fn next(&self, attempts: u32) -> Backoff {
        if attempts >= self.max_attempts {
            return Backoff::GiveUp;
        }
        let factor = self.multiplier.saturating_pow(attempts.saturating_sub(1));
        Backoff::Retry(self.initial_delay.saturating_mul(factor))
    }

    /// Runs `operation` until it succeeds or the policy gives up. Attempts
    /// are numbered from 1 and never overlap.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, Exhausted<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            let error = match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            match self.next(attempt) {
                Backoff::Retry(delay) => {
                    tracing::debug!("Attempt {} failed, retrying in {:?}", attempt, delay);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Backoff::GiveUp => {
                    return Err(Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_exhausted() {
        let policy = RetryPolicy::default();
        let decisions: Vec<_> = (1..=3).map(|attempt| policy.next(attempt)).collect();
        insta::assert_debug_snapshot!(decisions, @r"
        [
            Retry(
                200ms,
            ),
            Retry(
                400ms,
            ),
            GiveUp,
        ]
        ");
    }

    #[tokio::test]
    async fn stops_at_the_first_success() {
        let mut seen = Vec::new();
        let result = RetryPolicy::immediate(3)
            .run(|attempt| {
                seen.push(attempt);
                async move { if attempt == 2 { Ok(attempt) } else { Err("nope") } }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn reports_the_last_error() {
        let result: Result<(), _> = RetryPolicy::immediate(3)
            .run(|attempt| async move { Err(format!("attempt {attempt}")) })
            .await;
        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert_eq!(exhausted.error, "attempt 3");
    }
}
