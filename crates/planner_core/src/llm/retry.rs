//! Bounded retry policy shared by the gateway client and the entity matcher.
//!
//! # Invariants
//! - An operation runs at most `max_attempts` times (minimum one).
//! - Non-retryable failures stop immediately and are returned unchanged.

use log::warn;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Attempt budget with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later attempt.
    pub backoff: Duration,
}

/// Terminal failure of a retried operation.
#[derive(Debug)]
pub enum RetryError<E> {
    /// The operation failed in a way retrying cannot fix.
    Fatal(E),
    /// Every attempt failed; `last` is the final failure.
    Exhausted { attempts: u32, last: E },
}

impl<E: Display> Display for RetryError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fatal(err) => write!(f, "{err}"),
            Self::Exhausted { attempts, last } => {
                write!(f, "gave up after {attempts} attempts: {last}")
            }
        }
    }
}

impl<E: Error + 'static> Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fatal(err) => Some(err),
            Self::Exhausted { last, .. } => Some(last),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy that never sleeps; used for page-by-page scanning.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }

    /// Attempt numbers, starting at 1.
    pub fn attempts(&self) -> impl Iterator<Item = u32> {
        1..=self.max_attempts
    }

    /// Delay to wait before `attempt` (no delay before the first one).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 || self.backoff.is_zero() {
            return Duration::ZERO;
        }
        let exponent = (attempt - 2).min(16);
        self.backoff.saturating_mul(1u32 << exponent)
    }

    /// Runs `operation` until it succeeds, fails fatally, or the budget is
    /// spent. `retryable` decides which failures deserve another attempt.
    pub fn run<T, E, F, R>(&self, label: &str, mut operation: F, retryable: R) -> Result<T, RetryError<E>>
    where
        E: Display,
        F: FnMut(u32) -> Result<T, E>,
        R: Fn(&E) -> bool,
    {
        let mut attempt = 1;
        loop {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }

            match operation(attempt) {
                Ok(value) => return Ok(value),
                Err(err) if !retryable(&err) => return Err(RetryError::Fatal(err)),
                Err(err) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
                Err(err) => {
                    warn!(
                        "event=retry module=llm status=retry op={} attempt={} max_attempts={} error={}",
                        label, attempt, self.max_attempts, err
                    );
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryError, RetryPolicy};
    use std::cell::Cell;
    use std::time::Duration;

    #[test]
    fn succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, RetryError<String>> = RetryPolicy::immediate(3).run(
            "test",
            |attempt| {
                calls.set(calls.get() + 1);
                if attempt < 3 {
                    Err("flaky".to_string())
                } else {
                    Ok(attempt)
                }
            },
            |_| true,
        );
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn stops_at_budget() {
        let calls = Cell::new(0);
        let result: Result<(), RetryError<String>> = RetryPolicy::immediate(2).run(
            "test",
            |_| {
                calls.set(calls.get() + 1);
                Err("down".to_string())
            },
            |_| true,
        );
        assert!(matches!(
            result,
            Err(RetryError::Exhausted { attempts: 2, .. })
        ));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn fatal_error_is_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), RetryError<String>> = RetryPolicy::immediate(5).run(
            "test",
            |_| {
                calls.set(calls.get() + 1);
                Err("bad key".to_string())
            },
            |_| false,
        );
        assert!(matches!(result, Err(RetryError::Fatal(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn backoff_doubles_and_skips_first_attempt() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(100));
        assert_eq!(policy.delay_before(3), Duration::from_millis(200));
        assert_eq!(policy.delay_before(4), Duration::from_millis(400));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::immediate(0).attempts().count(), 1);
    }
}
