//! Event types for the meal planner event system
//!
//! Provides shared event definitions and the EventBus used both by the
//! database backends (change notices that wake live listeners) and by the
//! application state (snapshot notifications for the front end).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Meal planner event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MealPlanEvent {
    /// Documents in a collection were written or deleted
    ///
    /// Triggers:
    /// - Live listeners on that collection re-run their query
    CollectionChanged {
        /// Full collection path, e.g. `users/abc/groceries`
        collection: String,
        /// Number of documents touched by the commit
        documents: usize,
        /// When the commit completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Application state published a new snapshot
    ///
    /// Triggers:
    /// - Front end re-renders the affected list
    SnapshotPublished {
        /// Which list changed
        list: SnapshotList,
        /// Number of entries now in that list
        count: usize,
        /// When the snapshot was published
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An operation or listener failed; the message replaced any previous error
    ErrorRaised {
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// The three lists held by the application state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotList {
    Recipes,
    GroceryItems,
    WeeklyPlans,
}

impl MealPlanEvent {
    /// Get event type as string
    pub fn event_type(&self) -> &str {
        match self {
            MealPlanEvent::CollectionChanged { .. } => "CollectionChanged",
            MealPlanEvent::SnapshotPublished { .. } => "SnapshotPublished",
            MealPlanEvent::ErrorRaised { .. } => "ErrorRaised",
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use mealplan_common::events::{EventBus, MealPlanEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(MealPlanEvent::CollectionChanged {
///     collection: "users/abc/recipes".to_string(),
///     documents: 1,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MealPlanEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events.
    ///   A lagging listener simply re-queries, so small values are fine.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MealPlanEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: MealPlanEvent,
    ) -> Result<usize, broadcast::error::SendError<MealPlanEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MealPlanEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
