//! Cooperative cancellation for resolution runs.
//!
//! A [`CancellationSignal`] is cheap to clone; all clones observe the same state.
//! The resolver checks it before every network call and before every recursive
//! descent, and races in-flight calls against it with [`CancellationSignal::run`].

use crate::core::error::{ResolveError, Result};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Shared cancellation flag with async notification.
#[derive(Debug, Clone, Default)]
pub struct CancellationSignal {
    inner: Arc<Inner>,
}

impl CancellationSignal {
    /// Create a signal that has not fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal, waking every task waiting in [`cancelled`](Self::cancelled).
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`ResolveError::Cancelled`] if the signal has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() { Err(ResolveError::Cancelled) } else { Ok(()) }
    }

    /// Completes once the signal fires.
    pub async fn cancelled(&self) {
        loop {
            // Register interest before checking the flag so a concurrent
            // cancel() between the check and the await is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `future` to completion unless the signal fires first.
    pub async fn run<T, F>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.cancelled() => Err(ResolveError::Cancelled),
            result = future => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_completes_when_not_cancelled() {
        let signal = CancellationSignal::new();
        let value = signal.run(async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_run_aborts_pending_future() {
        let signal = CancellationSignal::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result: Result<()> = signal
            .run(async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(())
            })
            .await;
        assert_eq!(result, Err(ResolveError::Cancelled));
    }

    #[test]
    fn test_check_after_cancel() {
        let signal = CancellationSignal::new();
        assert!(signal.check().is_ok());
        signal.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.check(), Err(ResolveError::Cancelled));
    }
}
