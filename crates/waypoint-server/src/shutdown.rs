//! Stopping the listener without cutting off requests mid-flight.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancellation signal for the listener plus the grace period it gets to
/// finish open requests.
#[derive(Debug, Clone)]
pub struct Shutdown {
    token: CancellationToken,
    grace: Duration,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::with_grace(Duration::from_secs(10))
    }
}

impl Shutdown {
    /// Signal with a custom grace period.
    pub fn with_grace(grace: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace,
        }
    }

    /// Token the listener waits on.
    pub fn signal(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting connections. Idempotent.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether [`Shutdown::trigger`] has run.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trigger, then wait up to the grace period for `server` to exit.
    ///
    /// Returns `false` when the grace period ran out first.
    pub async fn drain(&self, server: JoinHandle<()>) -> bool {
        self.trigger();
        info!(grace_secs = self.grace.as_secs(), "waiting for open requests");
        match tokio::time::timeout(self.grace, server).await {
            Ok(_) => true,
            Err(_) => {
                warn!(grace = ?self.grace, "requests still open, giving up");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_signal() {
        let shutdown = Shutdown::default();
        let copy = shutdown.clone();
        let token = shutdown.signal();
        assert!(!copy.is_triggered());
        copy.trigger();
        copy.trigger();
        assert!(shutdown.is_triggered());
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn drain_returns_once_the_task_exits() {
        let shutdown = Shutdown::default();
        let token = shutdown.signal();
        let task = tokio::spawn(async move { token.cancelled().await });
        assert!(shutdown.drain(task).await);
    }

    #[tokio::test]
    async fn drain_gives_up_after_the_grace_period() {
        let shutdown = Shutdown::with_grace(Duration::from_millis(20));
        let stuck = tokio::spawn(std::future::pending::<()>());
        assert!(!shutdown.drain(stuck).await);
    }
}
