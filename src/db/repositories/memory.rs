use crate::{
    db::models::{CameraRegistration, RegistrationFilter},
    db::repositories::RegistrationStore,
    error::Error,
};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-process registration store for development and tests.
/// Documents are kept in insertion order.
#[derive(Default)]
pub struct MemoryRegistrationStore {
    registrations: RwLock<Vec<CameraRegistration>>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.registrations.read().await.len()
    }
}

fn same_email(a: Option<&str>, b: &str) -> bool {
    a.map_or(false, |a| a.trim().eq_ignore_ascii_case(b.trim()))
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn insert(&self, registration: &CameraRegistration) -> Result<CameraRegistration> {
        // Checked under the write lock so concurrent inserts cannot both pass
        let mut registrations = self.registrations.write().await;

        if let Some(email) = registration.email.as_deref() {
            if registrations
                .iter()
                .any(|r| same_email(r.email.as_deref(), email))
            {
                return Err(Error::Duplicate("This email is already registered".to_string()).into());
            }
        }
        if registrations.iter().any(|r| r.id == registration.id) {
            return Err(Error::Database(format!("Duplicate id {}", registration.id)).into());
        }

        registrations.push(registration.clone());
        Ok(registration.clone())
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Option<CameraRegistration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations.iter().find(|r| r.id == *id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<CameraRegistration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations
            .iter()
            .find(|r| same_email(r.email.as_deref(), email))
            .cloned())
    }

    async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<CameraRegistration>> {
        let registrations = self.registrations.read().await;
        Ok(registrations
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn update(&self, registration: &CameraRegistration) -> Result<CameraRegistration> {
        let mut registrations = self.registrations.write().await;

        if let Some(email) = registration.email.as_deref() {
            if registrations
                .iter()
                .any(|r| r.id != registration.id && same_email(r.email.as_deref(), email))
            {
                return Err(Error::Duplicate("This email is already registered".to_string()).into());
            }
        }

        let slot = registrations
            .iter_mut()
            .find(|r| r.id == registration.id)
            .ok_or_else(|| Error::NotFound(format!("Registration {}", registration.id)))?;

        // Identity, location and creation time are immutable
        slot.name = registration.name.clone();
        slot.email = registration.email.clone();
        slot.phone = registration.phone.clone();
        slot.camera_type = registration.camera_type;
        slot.coverage_area = registration.coverage_area;
        slot.preferences = registration.preferences;
        slot.updated_at = registration.updated_at;

        Ok(slot.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool> {
        let mut registrations = self.registrations.write().await;
        let before = registrations.len();
        registrations.retain(|r| r.id != *id);
        Ok(registrations.len() < before)
    }

    async fn clear(&self) -> Result<u64> {
        let mut registrations = self.registrations.write().await;
        let removed = registrations.len() as u64;
        registrations.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CameraType, CoverageArea, NewRegistration};
    use crate::geo::LatLng;

    fn registration(email: &str) -> CameraRegistration {
        NewRegistration {
            name: "Priya Sharma".to_string(),
            email: Some(email.to_string()),
            phone: "9000000002".to_string(),
            camera_type: CameraType::Bullet,
            coverage_area: CoverageArea::Parking,
            pincode: String::new(),
            locality: "Vaishali Nagar".to_string(),
            location: LatLng {
                lat: 26.9230,
                lng: 75.7960,
            },
        }
        .into_registration()
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let store = MemoryRegistrationStore::new();
        store.insert(&registration("a@x.com")).await.unwrap();

        let err = store.insert(&registration("A@X.com")).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Duplicate(_))));
        assert_eq!(store.len().await, 1);

        assert!(store.get_by_email("A@x.COM").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn update_keeps_location_and_rejects_taken_email() {
        let store = MemoryRegistrationStore::new();
        let first = store.insert(&registration("one@x.com")).await.unwrap();
        let second = store.insert(&registration("two@x.com")).await.unwrap();

        let mut moved = second.clone();
        moved.location = crate::db::models::GeoPoint(LatLng { lat: 0.0, lng: 0.0 });
        moved.name = "Renamed".to_string();
        let updated = store.update(&moved).await.unwrap();
        assert_eq!(updated.name, "Renamed");
        assert_eq!(updated.location, second.location);

        let mut clash = second.clone();
        clash.email = first.email.clone();
        let err = store.update(&clash).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Duplicate(_))));
    }

    #[tokio::test]
    async fn delete_and_clear_report_what_happened() {
        let store = MemoryRegistrationStore::new();
        let kept = store.insert(&registration("k@x.com")).await.unwrap();
        store.insert(&registration("d@x.com")).await.unwrap();

        assert!(store.delete(&kept.id).await.unwrap());
        assert!(!store.delete(&kept.id).await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store
            .list(&RegistrationFilter::default())
            .await
            .unwrap()
            .is_empty());
    }
}
