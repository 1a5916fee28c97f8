use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Shared cancellation flag. Clones observe the same state, so a
/// signal handler can hold one clone while the pipeline waits on
/// another.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as cancelled and wake every waiter.
    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`. Returns `true` as soon as the token
    /// is cancelled, `false` once the full timeout elapsed.
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut cancelled = flag.lock().unwrap_or_else(PoisonError::into_inner);

        while !*cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            cancelled = cvar
                .wait_timeout(cancelled, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    /// The probe produced a value on this attempt.
    Ready { value: T, attempt: u32 },
    /// Every attempt ran without a value.
    Exhausted { attempts: u32 },
    /// Cancelled before or while waiting for `attempt`.
    Cancelled { attempt: u32 },
}

/// Fixed-interval bounded retry.
///
/// ```
/// use std::time::Duration;
/// use relaunch::retry::{CancelToken, Retry, RetryOutcome};
///
/// let retry = Retry::new(5, Duration::ZERO);
/// let outcome = retry.run(&CancelToken::new(), |attempt| {
///     (attempt == 3).then_some("up")
/// });
///
/// assert_eq!(outcome, RetryOutcome::Ready { value: "up", attempt: 3 });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Retry {
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Call `probe` with attempt numbers `1..=max_attempts` until it
    /// returns `Some`. Sleeps `interval` between attempts, never
    /// after the last one.
    pub fn run<T, F>(&self, cancel: &CancelToken, mut probe: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Option<T>,
    {
        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return RetryOutcome::Cancelled { attempt };
            }

            if let Some(value) = probe(attempt) {
                return RetryOutcome::Ready { value, attempt };
            }

            if attempt < self.max_attempts && cancel.wait(self.interval) {
                return RetryOutcome::Cancelled {
                    attempt: attempt + 1,
                };
            }
        }

        RetryOutcome::Exhausted {
            attempts: self.max_attempts,
        }
    }
}
