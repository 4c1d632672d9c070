//! Process-wide network reachability signal.
//!
//! A single boolean flag kept current by whatever connectivity probe the
//! host wires in, plus a watch channel so the sync engine can react to
//! reconnects. The flag is the only thing the persistence router consults.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::info;

pub struct NetworkMonitor {
    online: AtomicBool,
    tx: watch::Sender<bool>,
}

impl NetworkMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (tx, _) = watch::channel(initially_online);
        Self {
            online: AtomicBool::new(initially_online),
            tx,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Update the reachability flag. Notifies subscribers only on an actual
    /// change, so connect/disconnect flapping does not amplify.
    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            info!(online, "Network reachability changed");
            let _ = self.tx.send(online);
        }
    }

    /// Subscribe to reachability changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flag_reflects_latest_state() {
        let monitor = NetworkMonitor::new(true);
        assert!(monitor.is_online());

        monitor.set_online(false);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let monitor = NetworkMonitor::new(false);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test]
    async fn test_no_notification_without_change() {
        let monitor = NetworkMonitor::new(true);
        let mut rx = monitor.subscribe();

        monitor.set_online(true);
        assert!(!rx.has_changed().unwrap());
    }
}
