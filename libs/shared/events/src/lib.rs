use serde::Serialize;
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub type EventSender = broadcast::Sender<String>;
pub type EventReceiver = broadcast::Receiver<String>;

pub const APPOINTMENT_CREATED: &str = "appointmentCreated";
pub const APPOINTMENT_UPDATED: &str = "appointmentUpdated";
pub const APPOINTMENT_DELETED: &str = "appointmentDeleted";

/// Fan-out channel for calendar changes.
///
/// Every mutation of the appointment store is pushed to all connected
/// viewers so their local calendar stays a cache, never the authority.
/// Slow subscribers lose messages (bounded buffer) and are expected to
/// refetch.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: EventSender,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn appointment_created<T: Serialize>(&self, appointment: &T) {
        self.send(APPOINTMENT_CREATED, json!({ "appointment": appointment }));
    }

    pub fn appointment_updated<T: Serialize>(&self, appointment: &T) {
        self.send(APPOINTMENT_UPDATED, json!({ "appointment": appointment }));
    }

    pub fn appointment_deleted(&self, id: i64) {
        self.send(APPOINTMENT_DELETED, json!({ "id": id }));
    }

    fn send(&self, event: &str, mut payload: serde_json::Value) {
        if let Some(object) = payload.as_object_mut() {
            object.insert("event".to_string(), json!(event));
        }

        let message = payload.to_string();

        // No subscribers is normal (nobody has the calendar open)
        match self.sender.send(message) {
            Ok(count) => debug!("Broadcast {} to {} clients", event, count),
            Err(_) => debug!("No clients connected for {}", event),
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Convenience for subscribers that need the event name without
/// deserializing the full payload.
pub fn event_name(message: &str) -> Option<String> {
    let value: serde_json::Value = match serde_json::from_str(message) {
        Ok(value) => value,
        Err(e) => {
            warn!("Unparseable event message: {}", e);
            return None;
        }
    };
    value
        .get("event")
        .and_then(|name| name.as_str())
        .map(str::to_string)
}
