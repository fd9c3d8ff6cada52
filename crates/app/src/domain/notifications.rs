//! Cart change notifications.
//!
//! A [`CartWatch`] fans out "the cart changed" signals to any number of
//! subscribers. The signal carries no payload: a woken subscriber pulls the
//! authoritative snapshot itself (via
//! [`OptimisticCart::refresh`](super::carts::controller::OptimisticCart::refresh)),
//! so a burst of notifications collapses into a single refresh rather than a
//! queue of stale deltas.

use tokio::sync::watch;

/// Publisher side of a cart's change signal.
#[derive(Debug, Clone)]
pub struct CartWatch {
    sender: watch::Sender<u64>,
}

impl CartWatch {
    /// Create a watch with no pending notification.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);

        Self { sender }
    }

    /// Signal every subscriber that the cart changed.
    pub fn notify_changed(&self) {
        self.sender.send_modify(|generation| *generation += 1);
    }

    /// A new subscription. Only changes published after this call wake it.
    #[must_use]
    pub fn subscribe(&self) -> CartChanges {
        CartChanges {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for CartWatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber side of a cart's change signal.
#[derive(Debug, Clone)]
pub struct CartChanges {
    receiver: watch::Receiver<u64>,
}

impl CartChanges {
    /// Wait until the cart changes.
    ///
    /// Returns `true` when a change was published, `false` once the publisher
    /// is gone and no further change can ever arrive. Intermediate
    /// notifications coalesce: several publishes between waits wake the
    /// subscriber once.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn notification_wakes_a_subscriber() {
        let watch = CartWatch::new();
        let mut changes = watch.subscribe();

        watch.notify_changed();

        assert!(changes.changed().await);
    }

    #[tokio::test]
    async fn burst_of_notifications_coalesces_into_one_wake() {
        let watch = CartWatch::new();
        let mut changes = watch.subscribe();

        watch.notify_changed();
        watch.notify_changed();
        watch.notify_changed();

        assert!(changes.changed().await);

        // The burst was consumed by the first wake; nothing is pending.
        drop(watch);

        assert!(!changes.changed().await);
    }

    #[tokio::test]
    async fn dropped_publisher_ends_the_subscription() {
        let watch = CartWatch::new();
        let mut changes = watch.subscribe();

        drop(watch);

        assert!(!changes.changed().await);
    }
}
