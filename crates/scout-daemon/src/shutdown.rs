use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Broadcast-based stop signal for the daemon's loops.
///
/// Loops `select!` on a receiver from [`subscribe`](Self::subscribe) and also
/// poll [`is_shutting_down`](Self::is_shutting_down) before starting work, so
/// a trigger that happened before they subscribed is not missed.
///
/// ```ignore
/// let shutdown = ShutdownSignal::new();
/// let mut rx = shutdown.subscribe();
///
/// tokio::select! {
///     _ = rx.recv() => { /* stop */ }
///     _ = ticker.tick() => { /* scan */ }
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    trigger: broadcast::Sender<()>,
    shutting_down: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (trigger, _) = broadcast::channel(1);
        Self {
            trigger,
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.trigger.subscribe()
    }

    /// Non-blocking check.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Relaxed)
    }

    /// Stop every subscriber. Calling it again is harmless.
    pub fn trigger(&self) {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_ok()
        {
            info!("shutdown signal triggered");
            let _ = self.trigger.send(());
        } else {
            warn!("shutdown already triggered");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.trigger.receiver_count()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
