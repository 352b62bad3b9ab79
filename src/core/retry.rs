//! Retry strategies shared by the network transports

use std::time::Duration;

/// How many times a delivery is attempted and how long to wait in between
///
/// # Example
///
/// ```
/// use log_pipeline::core::RetryStrategy;
/// use std::time::Duration;
///
/// let strategy = RetryStrategy::ExponentialBackoff {
///     attempts: 3,
///     base: Duration::from_millis(1000),
/// };
/// assert_eq!(strategy.delay_after(1), Some(Duration::from_millis(1000)));
/// assert_eq!(strategy.delay_after(2), Some(Duration::from_millis(2000)));
/// assert_eq!(strategy.delay_after(3), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Retry straight away
    Immediate(u32),

    /// Wait `base * attempt` after each failed attempt
    LinearBackoff { attempts: u32, base: Duration },

    /// Wait `base * 2^(attempt-1)` after each failed attempt
    ExponentialBackoff { attempts: u32, base: Duration },
}

impl RetryStrategy {
    /// Three attempts, 1s then 2s between them
    pub const fn http_default() -> Self {
        RetryStrategy::ExponentialBackoff {
            attempts: 3,
            base: Duration::from_millis(1000),
        }
    }

    /// Two attempts, 1s between them
    pub const fn webhook_default() -> Self {
        RetryStrategy::LinearBackoff {
            attempts: 2,
            base: Duration::from_millis(1000),
        }
    }

    /// Total number of attempts, at least one
    pub fn max_attempts(&self) -> u32 {
        let attempts = match self {
            RetryStrategy::Immediate(attempts) => *attempts,
            RetryStrategy::LinearBackoff { attempts, .. } => *attempts,
            RetryStrategy::ExponentialBackoff { attempts, .. } => *attempts,
        };
        attempts.max(1)
    }

    /// Delay before the next attempt once `attempt` (1-based) has failed
    ///
    /// `None` means the attempts are exhausted.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts() {
            return None;
        }
        Some(match self {
            RetryStrategy::Immediate(_) => Duration::ZERO,
            RetryStrategy::LinearBackoff { base, .. } => base.saturating_mul(attempt),
            RetryStrategy::ExponentialBackoff { base, .. } => {
                let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
                base.saturating_mul(factor)
            }
        })
    }

    /// Same shape with a different base delay
    #[must_use]
    pub fn with_base(self, new_base: Duration) -> Self {
        match self {
            RetryStrategy::Immediate(attempts) => RetryStrategy::Immediate(attempts),
            RetryStrategy::LinearBackoff { attempts, .. } => RetryStrategy::LinearBackoff {
                attempts,
                base: new_base,
            },
            RetryStrategy::ExponentialBackoff { attempts, .. } => {
                RetryStrategy::ExponentialBackoff {
                    attempts,
                    base: new_base,
                }
            }
        }
    }
}
