use crate::db::models::CameraRegistration;
use crate::geo::{Distance, LatLng};
use crate::messaging::{EventPublisher, EventType};
use anyhow::Result;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

/// Helper for publishing registry events
#[derive(Clone)]
pub struct RegistryEvents {
    publisher: Arc<dyn EventPublisher>,
}

impl RegistryEvents {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    pub async fn registration_created(&self, registration: &CameraRegistration) -> Result<()> {
        let payload = serde_json::json!({
            "registration_id": registration.id.to_string(),
            "name": registration.name,
            "camera_type": registration.camera_type,
            "location": registration.location.to_geojson(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.publisher
            .publish(EventType::RegistrationCreated, Some(registration.id), payload)
            .await?;

        info!("Published registration created event for {}", registration.id);
        Ok(())
    }

    pub async fn registration_updated(
        &self,
        registration: &CameraRegistration,
        updated_fields: &[&str],
    ) -> Result<()> {
        let payload = serde_json::json!({
            "registration_id": registration.id.to_string(),
            "updated_fields": updated_fields,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.publisher
            .publish(EventType::RegistrationUpdated, Some(registration.id), payload)
            .await?;

        info!("Published registration updated event for {}", registration.id);
        Ok(())
    }

    pub async fn registration_deleted(&self, registration_id: Uuid) -> Result<()> {
        let payload = serde_json::json!({
            "registration_id": registration_id.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.publisher
            .publish(EventType::RegistrationDeleted, Some(registration_id), payload)
            .await?;

        info!("Published registration deleted event for {}", registration_id);
        Ok(())
    }

    /// Queue a message for one camera owner
    pub async fn owner_message(&self, registration: &CameraRegistration, message: &str) -> Result<()> {
        let payload = serde_json::json!({
            "camera_id": registration.id.to_string(),
            "owner": registration.name,
            "phone": registration.phone,
            "email": registration.email,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.publisher
            .publish(EventType::OwnerMessage, Some(registration.id), payload)
            .await
    }

    /// Queue the per-owner copy of a broadcast
    pub async fn broadcast_recipient(
        &self,
        broadcast_id: Uuid,
        registration: &CameraRegistration,
        message: &str,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "broadcast_id": broadcast_id.to_string(),
            "camera_id": registration.id.to_string(),
            "owner": registration.name,
            "phone": registration.phone,
            "email": registration.email,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.publisher
            .publish(EventType::BroadcastMessage, Some(registration.id), payload)
            .await
    }

    /// Record that a broadcast went out
    pub async fn broadcast_sent(
        &self,
        broadcast_id: Uuid,
        center: LatLng,
        radius: Distance,
        recipients: usize,
    ) -> Result<()> {
        let payload = serde_json::json!({
            "broadcast_id": broadcast_id.to_string(),
            "center": { "lat": center.lat, "lng": center.lng },
            "radius_m": radius.as_meters(),
            "recipients": recipients,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        self.publisher
            .publish(EventType::BroadcastSent, None, payload)
            .await?;

        info!(
            "Broadcast {} queued for {} owners within {} of {}",
            broadcast_id, recipients, radius, center
        );
        Ok(())
    }

    pub async fn system_event(&self, event_type: EventType) -> Result<()> {
        let payload = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });
        self.publisher.publish(event_type, None, payload).await
    }
}
