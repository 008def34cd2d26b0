//! Broadcast channel for activities.
//!
//! [`ActivityBus`] wraps a [`tokio::sync::broadcast`] channel. Every state
//! mutation publishes its [`Activity`] records through the bus. WebSocket
//! connections and the persistence recorder subscribe to it.

use tokio::sync::broadcast;

use super::Activity;

/// Broadcast bus for [`Activity`] records.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest activities are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct ActivityBus {
    sender: broadcast::Sender<Activity>,
}

impl ActivityBus {
    /// Creates a new `ActivityBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an activity to all subscribers.
    ///
    /// Returns the number of receivers that received it. With no active
    /// receivers the activity is silently dropped.
    pub fn publish(&self, activity: Activity) -> usize {
        self.sender.send(activity).unwrap_or(0)
    }

    /// Publishes a batch of activities in order.
    pub fn publish_all(&self, activities: impl IntoIterator<Item = Activity>) {
        for activity in activities {
            let _ = self.publish(activity);
        }
    }

    /// Creates a new receiver that will receive all future activities.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Activity> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{ActivityCategory, EventSiteId, SiteStatus};
    use chrono::Utc;

    fn make_activity() -> Activity {
        Activity::SiteStatusChanged {
            event_site_id: EventSiteId::new(),
            from: SiteStatus::Available,
            to: SiteStatus::Allocated,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn publish_without_receivers_returns_zero() {
        let bus = ActivityBus::new(100);
        assert_eq!(bus.publish(make_activity()), 0);
    }

    #[tokio::test]
    async fn subscriber_receives_activity() {
        let bus = ActivityBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish(make_activity());

        let Ok(activity) = rx.recv().await else {
            panic!("expected to receive activity");
        };
        assert_eq!(activity.category(), ActivityCategory::SiteStatus);
    }

    #[tokio::test]
    async fn publish_all_preserves_order() {
        let bus = ActivityBus::new(100);
        let mut rx = bus.subscribe();

        bus.publish_all(vec![
            make_activity(),
            Activity::CleanupCompleted {
                deleted: 1,
                failed: 0,
                timestamp: Utc::now(),
            },
        ]);

        let Ok(first) = rx.recv().await else {
            panic!("first activity missing");
        };
        let Ok(second) = rx.recv().await else {
            panic!("second activity missing");
        };
        assert_eq!(first.kind(), "site_status_changed");
        assert_eq!(second.kind(), "cleanup_completed");
    }

    #[test]
    fn receiver_count_tracks_subscribers() {
        let bus = ActivityBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let rx1 = bus.subscribe();
        let _rx2 = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(rx1);
        assert_eq!(bus.receiver_count(), 1);
    }
}
