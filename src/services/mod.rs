pub mod owner_messaging;
pub mod registry;

pub use owner_messaging::{Delivery, OwnerMessagingService};
pub use registry::RegistryService;
