use crate::db::models::{CameraRegistration, RegistrationChanges, RegistrationFilter};
use crate::db::repositories::RegistrationStore;
use crate::error::Error;
use crate::geo::{nearest_first, Distance, LatLng, Ranked};
use crate::messaging::RegistryEvents;
use crate::registration::{validate_registration, validate_update, RegisterRequest, UpdateRequest};
use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

const DUPLICATE_EMAIL: &str = "This email is already registered";

/// Registration lifecycle on top of a store
#[derive(Clone)]
pub struct RegistryService {
    store: Arc<dyn RegistrationStore>,
    events: RegistryEvents,
    require_email: bool,
}

fn changed_fields(changes: &RegistrationChanges) -> Vec<&'static str> {
    let mut fields = Vec::new();
    if changes.name.is_some() {
        fields.push("name");
    }
    if changes.email.is_some() {
        fields.push("email");
    }
    if changes.phone.is_some() {
        fields.push("phone");
    }
    if changes.camera_type.is_some() {
        fields.push("cameraType");
    }
    if changes.coverage_area.is_some() {
        fields.push("coverageArea");
    }
    if changes.preferences.is_some() {
        fields.push("preferences");
    }
    fields
}

impl RegistryService {
    pub fn new(store: Arc<dyn RegistrationStore>, events: RegistryEvents, require_email: bool) -> Self {
        Self {
            store,
            events,
            require_email,
        }
    }

    pub fn store(&self) -> &Arc<dyn RegistrationStore> {
        &self.store
    }

    /// Validate and persist a new registration. Nothing is stored when
    /// validation or the duplicate check fails.
    pub async fn register(&self, request: &RegisterRequest) -> Result<CameraRegistration> {
        let new = validate_registration(request, self.require_email)?;

        if let Some(email) = new.email.as_deref() {
            if self.store.get_by_email(email).await?.is_some() {
                return Err(Error::Duplicate(DUPLICATE_EMAIL.to_string()).into());
            }
        }

        let registration = self.store.insert(&new.into_registration()).await?;
        info!(
            "Registered camera {} for {} at {}",
            registration.id, registration.name, registration.location.0
        );

        if let Err(e) = self.events.registration_created(&registration).await {
            warn!("Failed to publish registration event: {}", e);
        }

        Ok(registration)
    }

    pub async fn get(&self, id: &Uuid) -> Result<CameraRegistration> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| Error::NotFound("User not found".to_string()).into())
    }

    pub async fn list(&self, filter: &RegistrationFilter) -> Result<Vec<CameraRegistration>> {
        self.store.list(filter).await
    }

    /// Every registration inside `radius` of `center`, nearest first
    pub async fn nearby(&self, center: LatLng, radius: Distance) -> Result<Vec<Ranked<CameraRegistration>>> {
        let all = self.store.list(&RegistrationFilter::default()).await?;
        Ok(nearest_first(&all, center, radius))
    }

    /// Apply a profile update. Location and creation time never change.
    pub async fn update(&self, id: &Uuid, request: &UpdateRequest) -> Result<CameraRegistration> {
        let changes = validate_update(request)?;
        if changes.is_empty() {
            return Err(Error::Validation("No changes supplied".to_string()).into());
        }

        let mut registration = self.get(id).await?;

        if let Some(email) = changes.email.as_deref() {
            if let Some(existing) = self.store.get_by_email(email).await? {
                if existing.id != *id {
                    return Err(Error::Duplicate(DUPLICATE_EMAIL.to_string()).into());
                }
            }
        }

        let fields = changed_fields(&changes);
        changes.apply(&mut registration);
        let updated = self.store.update(&registration).await?;
        info!("Updated registration {} ({})", id, fields.join(", "));

        if let Err(e) = self.events.registration_updated(&updated, &fields).await {
            warn!("Failed to publish update event: {}", e);
        }

        Ok(updated)
    }

    pub async fn delete(&self, id: &Uuid) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::NotFound("User not found".to_string()).into());
        }
        info!("Deleted registration {}", id);

        if let Err(e) = self.events.registration_deleted(*id).await {
            warn!("Failed to publish delete event: {}", e);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::MemoryRegistrationStore;
    use crate::messaging::{EventType, MemoryPublisher};
    use serde_json::json;

    fn service() -> (RegistryService, Arc<MemoryRegistrationStore>, Arc<MemoryPublisher>) {
        let store = Arc::new(MemoryRegistrationStore::new());
        let publisher = Arc::new(MemoryPublisher::new());
        let service = RegistryService::new(store.clone(), RegistryEvents::new(publisher.clone()), true);
        (service, store, publisher)
    }

    fn request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some("Karan Verma".to_string()),
            email: Some(email.to_string()),
            phone: Some("9000000005".to_string()),
            lat: Some(json!(26.8500)),
            lng: Some(json!(75.8050)),
            locality: Some("Mansarovar".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn register_persists_and_announces() {
        let (service, store, publisher) = service();
        let registration = service.register(&request("karan.verma5@example.com")).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(service.get(&registration.id).await.unwrap(), registration);
        assert_eq!(publisher.events_of(&EventType::RegistrationCreated).len(), 1);
    }

    #[tokio::test]
    async fn invalid_request_stores_nothing() {
        let (service, store, publisher) = service();
        let mut bad = request("x@example.com");
        bad.phone = None;
        bad.lat = None;

        let err = service.register(&bad).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
        assert_eq!(store.len().await, 0);
        assert!(publisher.events().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_differs_only_in_case() {
        let (service, store, _) = service();
        service.register(&request("a@x.com")).await.unwrap();

        let err = service.register(&request("A@X.com")).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<Error>(),
            Some(&Error::Duplicate("This email is already registered".to_string()))
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_changes_profile_but_not_location() {
        let (service, _, publisher) = service();
        let registration = service.register(&request("owner@x.com")).await.unwrap();

        let updated = service
            .update(
                &registration.id,
                &UpdateRequest {
                    phone: Some("9222222222".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.phone, "9222222222");
        assert_eq!(updated.location, registration.location);
        assert_eq!(updated.created_at, registration.created_at);

        let events = publisher.events_of(&EventType::RegistrationUpdated);
        assert_eq!(events[0].payload["updated_fields"], json!(["phone"]));
    }

    #[tokio::test]
    async fn update_cannot_take_another_owners_email() {
        let (service, _, _) = service();
        service.register(&request("first@x.com")).await.unwrap();
        let second = service.register(&request("second@x.com")).await.unwrap();

        let err = service
            .update(
                &second.id,
                &UpdateRequest {
                    email: Some("FIRST@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Duplicate(_))));

        // Re-saving your own email is fine
        assert!(service
            .update(
                &second.id,
                &UpdateRequest {
                    email: Some("Second@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let (service, _, _) = service();
        let registration = service.register(&request("gone@x.com")).await.unwrap();

        service.delete(&registration.id).await.unwrap();
        let err = service.delete(&registration.id).await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn nearby_excludes_far_cameras() {
        let (service, _, _) = service();
        let near = service.register(&request("near@x.com")).await.unwrap();
        let mut far = request("far@x.com");
        far.lat = Some(json!(27.2000));
        service.register(&far).await.unwrap();

        let center = LatLng {
            lat: 26.8510,
            lng: 75.8050,
        };
        let found = service.nearby(center, Distance::km(1.0)).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].item.id, near.id);
    }
}
