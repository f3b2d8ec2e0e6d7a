//! Idempotent shutdown latch

use std::sync::Arc;
use tokio::sync::watch;

/// Broadcast shutdown signal observable by any number of waiters.
///
/// Clones share the same latch. Once tripped it stays tripped forever.
#[derive(Debug, Clone)]
pub struct ShutdownOnce {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownOnce {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trip the latch. Idempotent.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the latch is tripped; immediately if it already was.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        // The send half lives in self, so this can only fail after the
        // latch has already been observed tripped.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

impl Default for ShutdownOnce {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_open() {
        let latch = ShutdownOnce::new();
        assert!(!latch.is_shutdown());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let latch = ShutdownOnce::new();
        latch.shutdown();
        latch.shutdown();
        assert!(latch.is_shutdown());
    }

    #[tokio::test]
    async fn test_clones_share_the_latch() {
        let latch = ShutdownOnce::new();
        let observer = latch.clone();

        latch.shutdown();
        assert!(observer.is_shutdown());
        observer.wait().await;
    }

    #[tokio::test]
    async fn test_wait_wakes_on_shutdown() {
        let latch = ShutdownOnce::new();
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        latch.shutdown();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake promptly")
            .unwrap();
    }
}
