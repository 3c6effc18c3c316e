//! Counter of dispatched work that has not finished yet.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    pending: AtomicUsize,
    idle: Notify,
}

impl InFlight {
    pub(crate) fn begin(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn end(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Resolves once the counter reaches zero.
    pub(crate) async fn wait(&self) {
        loop {
            let notified = self.idle.notified();
            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn wait_returns_immediately_when_idle() {
        InFlight::default().wait().await;
    }

    #[tokio::test]
    async fn wait_resolves_after_last_end() {
        let inflight = Arc::new(InFlight::default());
        inflight.begin();
        inflight.begin();

        let waiter = tokio::spawn({
            let inflight = Arc::clone(&inflight);
            async move { inflight.wait().await }
        });

        inflight.end();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        inflight.end();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(inflight.pending(), 0);
    }
}
