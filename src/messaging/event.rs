use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Event types published by the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EventType {
    // Registration lifecycle
    RegistrationCreated,
    RegistrationUpdated,
    RegistrationDeleted,

    // Owner messaging
    OwnerMessage,
    BroadcastMessage,
    BroadcastSent,

    // System events
    SystemStartup,
    SystemShutdown,

    // Custom event
    Custom(String),
}

impl Display for EventType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RegistrationCreated => write!(f, "registration.created"),
            Self::RegistrationUpdated => write!(f, "registration.updated"),
            Self::RegistrationDeleted => write!(f, "registration.deleted"),
            Self::OwnerMessage => write!(f, "owner.message"),
            Self::BroadcastMessage => write!(f, "owner.broadcast"),
            Self::BroadcastSent => write!(f, "admin.broadcast_sent"),
            Self::SystemStartup => write!(f, "system.startup"),
            Self::SystemShutdown => write!(f, "system.shutdown"),
            Self::Custom(name) => write!(f, "custom.{}", name),
        }
    }
}

/// Event message structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    /// Unique event ID
    pub id: Uuid,
    pub event_type: EventType,
    /// Registration the event concerns, if any
    pub source_id: Option<Uuid>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub payload: serde_json::Value,
}

impl EventMessage {
    pub fn new<T: Serialize>(
        event_type: EventType,
        source_id: Option<Uuid>,
        payload: T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            event_type,
            source_id,
            timestamp: chrono::Utc::now(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Get the routing key for the event
    pub fn routing_key(&self) -> String {
        match &self.source_id {
            Some(id) => format!("{}.{}", self.event_type, id),
            None => self.event_type.to_string(),
        }
    }
}
