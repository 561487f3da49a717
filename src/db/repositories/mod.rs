use crate::db::models::{CameraRegistration, RegistrationFilter};
use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub mod memory;
pub mod registrations;

pub use memory::MemoryRegistrationStore;
pub use registrations::RegistrationsRepository;

/// Persistence for camera registrations.
///
/// Implementations return [`crate::error::Error::Duplicate`] when an insert or
/// update would give two registrations the same email (compared
/// case-insensitively), and never persist anything in that case.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Insert a new registration
    async fn insert(&self, registration: &CameraRegistration) -> Result<CameraRegistration>;

    /// Get registration by ID
    async fn get_by_id(&self, id: &Uuid) -> Result<Option<CameraRegistration>>;

    /// Get registration by email, ignoring case
    async fn get_by_email(&self, email: &str) -> Result<Option<CameraRegistration>>;

    /// List registrations matching the filter, oldest first
    async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<CameraRegistration>>;

    /// Replace the mutable fields of an existing registration
    async fn update(&self, registration: &CameraRegistration) -> Result<CameraRegistration>;

    /// Delete registration; false when it did not exist
    async fn delete(&self, id: &Uuid) -> Result<bool>;

    /// Remove every registration; returns how many were removed
    async fn clear(&self) -> Result<u64>;

    /// Cheap liveness probe
    async fn health_check(&self) -> bool {
        true
    }
}
