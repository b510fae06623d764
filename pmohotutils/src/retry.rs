//! Boucle de réessai bornée à délai fixe.
//!
//! Toutes les étapes faillibles de l'orchestration passent par [`retry`] :
//! c'est le seul point de suspension du programme (attente par sondage,
//! jamais par événement).

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Bounded retry settings: `max_attempts` invocations separated by a fixed
/// `delay`. No jitter, no backoff: total waits are a few seconds at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy without any delay between attempts (utile pour les tests).
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO)
    }
}

/// All attempts failed; carries the last underlying error.
#[derive(Debug, Error)]
#[error("{label} failed after {attempts} attempt(s): {source}")]
pub struct Exhausted<E>
where
    E: std::error::Error + 'static,
{
    pub label: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

/// Invokes `op` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between attempts. Returns the first success, or [`Exhausted`] wrapping
/// the last error. `op` receives the 1-based attempt number.
///
/// A `max_attempts` of zero is treated as one attempt.
pub fn retry<T, E, F>(label: &str, policy: RetryPolicy, mut op: F) -> Result<T, Exhausted<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(u32) -> Result<T, E>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!(label, attempt, max_attempts, error = %err, "attempt failed");
                if attempt >= max_attempts {
                    return Err(Exhausted {
                        label: label.to_string(),
                        attempts: attempt,
                        source: err,
                    });
                }
            }
        }
        if !policy.delay.is_zero() {
            thread::sleep(policy.delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn failure(msg: &str) -> io::Error {
        io::Error::other(msg)
    }

    #[test]
    fn test_first_attempt_success() {
        let mut calls = 0;
        let result: Result<u32, _> = retry("op", RetryPolicy::immediate(5), |_| {
            calls += 1;
            Ok::<_, io::Error>(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_success_on_later_attempt() {
        let mut calls = 0;
        let result = retry("op", RetryPolicy::immediate(5), |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(failure("not yet"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausted_carries_last_error() {
        let mut calls = 0;
        let result: Result<(), _> = retry("doomed", RetryPolicy::immediate(4), |attempt| {
            calls += 1;
            Err(failure(&format!("boom {attempt}")))
        });
        let err = result.unwrap_err();
        assert_eq!(calls, 4);
        assert_eq!(err.attempts, 4);
        assert_eq!(err.label, "doomed");
        assert_eq!(err.source.to_string(), "boom 4");
    }

    #[test]
    fn test_zero_attempts_still_runs_once() {
        let mut calls = 0;
        let result: Result<(), _> = retry("op", RetryPolicy::immediate(0), |_| {
            calls += 1;
            Err(failure("boom"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
