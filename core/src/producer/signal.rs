//! Cancellation handle for a production run

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cloneable switch that interrupts the producer
///
/// Setting it stops the producer before its next source item, wakes it if it
/// is blocked on a full queue and turns the final stop into a forced one.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// New, not cancelled
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Clear the flag at the start of a new run
    pub(crate) fn reset(&self) {
        self.tx.send_replace(false);
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Call `on_interrupt` once `interrupt` resolves
///
/// `interrupt` is normally `tokio::signal::ctrl_c()`. Abort the returned task
/// to stop listening.
pub fn spawn_interrupt_listener<S, F>(interrupt: S, on_interrupt: F) -> JoinHandle<()>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    tokio::spawn(async move {
        match interrupt.await {
            Ok(()) => on_interrupt(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        }
    })
}

/// Let Ctrl+C end the process with status 130 from now on
///
/// Once the runtime has listened for SIGINT its handler stays installed, so
/// after a run nothing would act on the signal any more.
pub fn exit_on_interrupt() -> JoinHandle<()> {
    spawn_interrupt_listener(tokio::signal::ctrl_c(), || {
        tracing::warn!("Received Ctrl+C, exiting");
        std::process::exit(130);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[test]
    fn test_cancel_and_reset() {
        let handle = CancelHandle::new();
        let other = handle.clone();
        assert!(!handle.is_cancelled());

        other.cancel();
        assert!(handle.is_cancelled());

        handle.reset();
        assert!(!other.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let handle = CancelHandle::new();
        let waiter = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        handle.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_listener_fires_on_signal() {
        let (signal_tx, signal_rx) = oneshot::channel::<()>();
        let (fired_tx, fired_rx) = oneshot::channel::<()>();
        let listener = spawn_interrupt_listener(
            async move { signal_rx.await.map_err(std::io::Error::other) },
            move || {
                let _ = fired_tx.send(());
            },
        );

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!listener.is_finished());

        signal_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), fired_rx)
            .await
            .unwrap()
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_interrupt_listener_skips_action_on_listen_error() {
        let fired = Arc::new(AtomicBool::new(false));
        let listener = {
            let fired = Arc::clone(&fired);
            spawn_interrupt_listener(
                async { Err(std::io::Error::other("signal unavailable")) },
                move || fired.store(true, Ordering::SeqCst),
            )
        };

        listener.await.unwrap();
        assert!(!fired.load(Ordering::SeqCst));
    }
}
