//! Session-scoped cancellation.

use std::sync::Arc;

use tokio::sync::watch;

/// Abort signal for one in-flight request.
///
/// Clones share the same signal, so the handle can be given to a Ctrl-C
/// task or a UI button while the session itself is busy awaiting the
/// network. Each session owns its own handle; there is no global abort.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the abort signal.
    ///
    /// Idempotent: returns `true` only for the call that raised it.
    pub fn abort(&self) -> bool {
        self.tx.send_if_modified(|aborted| {
            if *aborted {
                false
            } else {
                *aborted = true;
                true
            }
        })
    }

    pub fn is_aborted(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`abort`](Self::abort) has been called.
    pub async fn aborted(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this only returns on abort.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_abort_is_idempotent() {
        let handle = CancelHandle::new();
        assert!(!handle.is_aborted());
        assert!(handle.abort());
        assert!(!handle.abort());
        assert!(handle.is_aborted());
    }

    #[test]
    fn test_clones_share_signal() {
        let handle = CancelHandle::new();
        let other = handle.clone();
        other.abort();
        assert!(handle.is_aborted());
    }

    #[tokio::test]
    async fn test_aborted_resolves_after_abort() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.aborted().await });
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("aborted() should resolve")
            .unwrap();
    }

    #[tokio::test]
    async fn test_aborted_resolves_immediately_when_already_aborted() {
        let handle = CancelHandle::new();
        handle.abort();
        tokio::time::timeout(Duration::from_millis(100), handle.aborted())
            .await
            .expect("already aborted");
    }

    #[tokio::test]
    async fn test_aborted_pends_without_abort() {
        let handle = CancelHandle::new();
        let result = tokio::time::timeout(Duration::from_millis(20), handle.aborted()).await;
        assert!(result.is_err());
    }
}
