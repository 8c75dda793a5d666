//! Cooperative shutdown signal shared by the long-lived loops.
//!
//! Both the scan cycle and the dispatch consumer check this signal at every
//! suspension point; triggering it wakes any loop currently sleeping.

use std::sync::Arc;

use tokio::sync::watch;

/// A one-way shutdown latch. Once triggered it stays triggered.
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Arc<Self> {
        let (tx, _rx) = watch::channel(false);
        Arc::new(Self { tx })
    }

    /// Trigger shutdown, waking all current and future waiters.
    pub fn trigger(&self) {
        // send_replace stores the value even when no receiver is live.
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once shutdown has been triggered.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_resolves_after_trigger() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        // Must resolve immediately even though trigger preceded the wait.
        shutdown.wait().await;
    }

    #[tokio::test]
    async fn test_wakes_pending_waiter() {
        let shutdown = Shutdown::new();
        let waiter = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { shutdown.wait().await })
        };
        tokio::task::yield_now().await;
        shutdown.trigger();
        waiter.await.unwrap();
    }
}
