use std::time::Duration;

/// Fixed-pause retry policy.
///
/// # Examples
///
/// ```
/// use dfmon_common::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::fixed(3, Duration::from_millis(0));
/// let mut calls = 0;
/// let value = policy
///     .run("demo", |_attempt| {
///         calls += 1;
///         if calls < 2 { Err("busy") } else { Ok(42) }
///     })
///     .unwrap();
/// assert_eq!(value, 42);
/// assert_eq!(calls, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub pause: Duration,
}

/// All attempts failed. Carries the error from the final attempt.
#[derive(Debug, thiserror::Error)]
#[error("gave up after {attempts} attempt(s): {last}")]
pub struct RetryError<E: std::fmt::Display> {
    pub attempts: u32,
    pub last: E,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, pause: Duration) -> Self {
        Self {
            max_attempts,
            pause,
        }
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    ///
    /// `op` receives the 1-based attempt number. The pause is applied between
    /// attempts only, never after the last one. A budget of 0 still runs once.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= max => {
                    return Err(RetryError {
                        attempts: attempt,
                        last: e,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        what = what,
                        attempt = attempt,
                        max_attempts = max,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                }
            }
            std::thread::sleep(self.pause);
            attempt += 1;
        }
    }
}
