//! Event channels connecting the models to their consumers.
//!
//! The roster and the update manager both need to tell interested parties
//! "something about X changed" without knowing who is listening. Rather than
//! an observer set with an implicit delivery thread, [`EventHub`] makes the
//! delivery contract explicit:
//!
//! - `publish` never blocks and never fails; it is safe to call from any
//!   task or thread.
//! - Every subscriber receives every event published **after** its
//!   subscription, in publish order.
//! - Events are delivered on the subscriber's own task, whenever it chooses
//!   to poll its receiver. Nothing runs inline with the publisher.
//! - Dropping a receiver silently ends that subscription; the hub prunes
//!   closed channels on the next publish.
//!
//! Consumers are expected to treat events as change hints and re-query
//! current state, so a slow subscriber observes a compressed but never
//! reordered history.

use std::sync::Mutex;
use tokio::sync::mpsc;

/// A multi-subscriber broadcast channel for model change events.
///
/// Cloneable event values are fanned out to every live subscriber over
/// unbounded channels.
///
/// # Examples
///
/// ```rust
/// use cartwheel::events::EventHub;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let hub: EventHub<u32> = EventHub::new();
/// let mut sub = hub.subscribe();
///
/// hub.publish(1);
/// hub.publish(2);
///
/// assert_eq!(sub.recv().await, Some(1));
/// assert_eq!(sub.recv().await, Some(2));
/// # }
/// ```
#[derive(Debug)]
pub struct EventHub<T> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> EventHub<T> {
    /// Create a hub with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber.
    ///
    /// The returned receiver observes every event published after this call.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().expect("event hub lock poisoned").push(tx);
        rx
    }

    /// Deliver an event to all live subscribers, pruning closed ones.
    pub fn publish(&self, event: T) {
        let mut subscribers = self.subscribers.lock().expect("event hub lock poisoned");
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of currently live subscriptions.
    ///
    /// Subscriptions whose receiver was dropped still count until the next
    /// publish prunes them.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("event hub lock poisoned").len()
    }
}

impl<T: Clone> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_arrive_in_publish_order() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();

        for i in 0..5 {
            hub.publish(i);
        }
        for i in 0..5 {
            assert_eq!(sub.recv().await, Some(i));
        }
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_events_after_subscription() {
        let hub = EventHub::new();
        hub.publish("early");

        let mut sub = hub.subscribe();
        hub.publish("late");

        assert_eq!(sub.recv().await, Some("late"));
    }

    #[tokio::test]
    async fn test_dropped_receivers_are_pruned() {
        let hub = EventHub::new();
        let sub = hub.subscribe();
        let _live = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(sub);
        hub.publish(0u8);
        assert_eq!(hub.subscriber_count(), 1);
    }
}
