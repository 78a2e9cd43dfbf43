//! Single-shot session expiry timer.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::debug;

/// At most one pending expiry per tab.
///
/// Every arm or cancel bumps a generation counter. A firing timer must
/// [`claim`](ExpiryTimer::claim) its generation before acting, so a timer
/// superseded by a newer session is a no-op even if it already woke up, and
/// a generation can be claimed only once.
#[derive(Debug, Default)]
pub struct ExpiryTimer {
    generation: AtomicU64,
    task: Mutex<Option<AbortHandle>>,
}

impl ExpiryTimer {
    /// Create an unarmed timer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending timer and schedule `on_fire(generation)` after
    /// `delay`. Returns the new generation.
    ///
    /// Outside a tokio runtime nothing is scheduled; expiry is then only
    /// detected when the session is next checked.
    pub fn arm<F>(&self, delay: Duration, on_fire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        match Handle::try_current() {
            Ok(runtime) => {
                let handle = runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    on_fire(generation);
                });
                *task = Some(handle.abort_handle());
                debug!(generation, delay_ms = delay.as_millis() as u64, "Expiry timer armed");
            }
            Err(_) => {
                debug!(generation, "No async runtime, expiry timer not scheduled");
            }
        }
        generation
    }

    /// Cancel the pending timer, if any.
    pub fn cancel(&self) {
        let mut task = self.task.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = task.take() {
            handle.abort();
            debug!("Expiry timer cancelled");
        }
    }

    /// Take ownership of a firing. True exactly once, and only if `generation`
    /// is still the current one.
    pub fn claim(&self, generation: u64) -> bool {
        self.generation
            .compare_exchange(generation, generation + 1, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// True while a scheduled timer has neither fired nor been cancelled.
    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let timer = Arc::new(ExpiryTimer::new());
        let fired = Arc::new(AtomicUsize::new(0));

        let (t, f) = (timer.clone(), fired.clone());
        timer.arm(Duration::from_secs(5), move |generation| {
            if t.claim(generation) {
                f.fetch_add(1, Ordering::SeqCst);
            }
        });
        assert!(timer.is_armed());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_cancels_previous() {
        let timer = Arc::new(ExpiryTimer::new());
        let fired = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let (t, f) = (timer.clone(), fired.clone());
        timer.arm(Duration::from_secs(1), move |g| {
            if t.claim(g) {
                f.lock().push("first");
            }
        });
        let (t, f) = (timer.clone(), fired.clone());
        timer.arm(Duration::from_secs(3), move |g| {
            if t.claim(g) {
                f.lock().push("second");
            }
        });

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(*fired.lock(), vec!["second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let timer = Arc::new(ExpiryTimer::new());
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();
        timer.arm(Duration::from_millis(10), move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
        timer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_stale_generation_cannot_claim() {
        let timer = ExpiryTimer::new();
        let first = timer.arm(Duration::ZERO, |_| {});
        let second = timer.arm(Duration::ZERO, |_| {});
        assert!(!timer.claim(first));
        assert!(timer.claim(second));
        assert!(!timer.claim(second));
        assert!(!timer.is_armed());
    }
}
