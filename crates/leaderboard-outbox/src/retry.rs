//! Exponential backoff policy for outbox delivery.

use std::time::Duration;

use leaderboard_core::error::DomainError;

use crate::error::DeliveryFailure;
use crate::transport::TransportError;

/// Bounded exponential backoff.
///
/// `max_attempts` counts every delivery attempt, including the first. After
/// the k-th failed attempt the next one waits
/// `min(base_delay * growth_factor^(k-1), max_delay)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total delivery attempts before giving up.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Multiplier applied per attempt.
    pub growth_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(120 * 60),
            growth_factor: 2.0,
        }
    }
}

/// What to do with a message after a failed attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    /// Try again once the delay has elapsed.
    RetryAfter(Duration),
    /// Stop and dead-letter.
    GiveUp(DeliveryFailure),
}

impl RetryPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `max_attempts` is zero, the growth
    /// factor is below 1 or not finite, or `base_delay` exceeds `max_delay`.
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        growth_factor: f64,
    ) -> Result<Self, DomainError> {
        if max_attempts == 0 {
            return Err(DomainError::Validation(
                "retry max_attempts must be at least 1".into(),
            ));
        }
        if !growth_factor.is_finite() || growth_factor < 1.0 {
            return Err(DomainError::Validation(format!(
                "retry growth factor must be a finite number >= 1, got {growth_factor}"
            )));
        }
        if base_delay > max_delay {
            return Err(DomainError::Validation(format!(
                "retry base delay {base_delay:?} exceeds max delay {max_delay:?}"
            )));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            growth_factor,
        })
    }

    /// The wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.growth_factor.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs)
    }

    /// The full delay schedule between attempts (`max_attempts - 1` entries).
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..self.max_attempts).map(|attempt| self.delay_after_attempt(attempt))
    }

    /// Decides the fate of a message whose attempt number `attempts_made`
    /// just failed with `error`.
    #[must_use]
    pub fn decide(&self, attempts_made: u32, error: &TransportError) -> RetryDecision {
        let failure = self.classify(attempts_made, error);
        if failure.is_terminal() {
            RetryDecision::GiveUp(failure)
        } else {
            RetryDecision::RetryAfter(self.delay_after_attempt(attempts_made))
        }
    }

    /// Names the failure of attempt number `attempts_made`.
    #[must_use]
    pub fn classify(&self, attempts_made: u32, error: &TransportError) -> DeliveryFailure {
        if !error.is_transient() {
            DeliveryFailure::ValidationFailure(error.to_string())
        } else if attempts_made >= self.max_attempts {
            DeliveryFailure::DeliveryExhausted {
                attempts: attempts_made,
                last_error: error.to_string(),
            }
        } else {
            DeliveryFailure::TransportFailure(error.to_string())
        }
    }
}
