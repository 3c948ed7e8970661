//! Graceful shutdown for the Merit node.
//!
//! The controller flips a `tokio::sync::watch` flag on SIGINT/SIGTERM or on
//! request. A [`ShutdownSignal`] taken after the flag flipped still observes
//! it, so a miner started late never runs past a shutdown it missed.

use tokio::signal;
use tokio::sync::watch;

/// Coordinates graceful shutdown across node subsystems.
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

/// One subsystem's view of the shutdown flag.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trigger shutdown programmatically. Idempotent.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "cannot install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => { tracing::info!("received SIGINT, shutting down"); }
            _ = terminate => { tracing::info!("received SIGTERM, shutting down"); }
        }

        self.shutdown();
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered, or at once if it already was.
    /// A dropped controller counts as shutdown.
    pub async fn recv(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn programmatic_shutdown_notifies_every_signal() {
        let controller = ShutdownController::new();
        let mut first = controller.subscribe();
        let mut second = first.clone();
        controller.shutdown();
        first.recv().await;
        second.recv().await;
        assert!(first.is_shutdown());
        assert!(controller.is_shutdown());
    }

    #[tokio::test]
    async fn late_subscriber_sees_earlier_shutdown() {
        let controller = ShutdownController::new();
        controller.shutdown();
        controller.shutdown();
        let mut late = controller.subscribe();
        assert!(late.is_shutdown());
        late.recv().await;
    }

    #[tokio::test]
    async fn dropped_controller_releases_signal() {
        let controller = ShutdownController::new();
        let mut signal = controller.subscribe();
        drop(controller);
        signal.recv().await;
        assert!(!signal.is_shutdown());
    }
}
