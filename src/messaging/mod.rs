pub mod broker;
pub mod event;
pub mod registry_events;

pub use broker::{create_publisher, EventPublisher, LogPublisher, MemoryPublisher, MessageBroker};
pub use event::{EventMessage, EventType};
pub use registry_events::RegistryEvents;
