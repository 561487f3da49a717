use crate::db::models::{CameraRegistration, RegistrationFilter};
use crate::db::repositories::RegistrationStore;
use crate::error::Error;
use crate::geo::{nearest_first, Distance, LatLng};
use crate::messaging::RegistryEvents;
use anyhow::Result;
use futures::future::join_all;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// Broadcast radius bounds in meters
pub const MIN_BROADCAST_RADIUS_M: f64 = 100.0;
pub const MAX_BROADCAST_RADIUS_M: f64 = 5000.0;

/// Outcome of a queued message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// Owners whose message was queued
    pub recipients: usize,
    pub camera_ids: Vec<Uuid>,
    /// Targets whose message could not be queued
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_camera_ids: Vec<Uuid>,
}

/// Queues admin messages to camera owners. Messages are published, delivery
/// is left to whatever consumes the events.
#[derive(Clone)]
pub struct OwnerMessagingService {
    store: Arc<dyn RegistrationStore>,
    events: RegistryEvents,
}

fn message_text(message: &str) -> Result<&str, Error> {
    let message = message.trim();
    if message.is_empty() {
        return Err(Error::Validation("Message is required".to_string()));
    }
    Ok(message)
}

impl OwnerMessagingService {
    pub fn new(store: Arc<dyn RegistrationStore>, events: RegistryEvents) -> Self {
        Self { store, events }
    }

    pub async fn send_single(&self, camera_id: &Uuid, message: &str) -> Result<Delivery> {
        let message = message_text(message)?;
        let registration = self
            .store
            .get_by_id(camera_id)
            .await?
            .ok_or_else(|| Error::NotFound("Camera not found".to_string()))?;

        self.events.owner_message(&registration, message).await?;
        info!("Queued message for owner of camera {}", camera_id);

        Ok(Delivery {
            recipients: 1,
            camera_ids: vec![registration.id],
            failed_camera_ids: Vec::new(),
        })
    }

    /// Resolve who a broadcast reaches. When `camera_ids` is given it narrows
    /// the in-radius set and never widens it.
    pub async fn broadcast_targets(
        &self,
        center: LatLng,
        radius: Distance,
        camera_ids: Option<&[Uuid]>,
    ) -> Result<Vec<CameraRegistration>> {
        let all = self.store.list(&RegistrationFilter::default()).await?;
        let wanted: Option<HashSet<&Uuid>> = camera_ids.map(|ids| ids.iter().collect());

        Ok(nearest_first(&all, center, radius)
            .into_iter()
            .map(|ranked| ranked.item)
            .filter(|r| wanted.as_ref().map_or(true, |w| w.contains(&r.id)))
            .collect())
    }

    pub async fn broadcast(
        &self,
        center: LatLng,
        radius: Distance,
        message: &str,
        camera_ids: Option<&[Uuid]>,
    ) -> Result<Delivery> {
        let message = message_text(message)?;
        let meters = radius.as_meters();
        if !(MIN_BROADCAST_RADIUS_M..=MAX_BROADCAST_RADIUS_M).contains(&meters) {
            return Err(Error::Validation(format!(
                "Radius must be between {} and {} meters",
                MIN_BROADCAST_RADIUS_M, MAX_BROADCAST_RADIUS_M
            ))
            .into());
        }

        let targets = self.broadcast_targets(center, radius, camera_ids).await?;
        if targets.is_empty() {
            return Err(Error::NotFound("No cameras found in this radius".to_string()).into());
        }

        let broadcast_id = Uuid::new_v4();
        let outcomes = join_all(
            targets
                .iter()
                .map(|target| self.events.broadcast_recipient(broadcast_id, target, message)),
        )
        .await;

        let mut reached = Vec::with_capacity(targets.len());
        let mut failed_camera_ids = Vec::new();
        for (target, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => reached.push(target.id),
                Err(e) => {
                    warn!(
                        "Broadcast {} could not reach owner of camera {}: {}",
                        broadcast_id, target.id, e
                    );
                    failed_camera_ids.push(target.id);
                }
            }
        }

        if reached.is_empty() {
            return Err(Error::Messaging(format!(
                "Broadcast {} reached none of {} owners",
                broadcast_id,
                targets.len()
            ))
            .into());
        }

        // Owners are already messaged; the summary event must not undo that
        if let Err(e) = self
            .events
            .broadcast_sent(broadcast_id, center, radius, reached.len())
            .await
        {
            warn!("Failed to publish summary of broadcast {}: {}", broadcast_id, e);
        }

        Ok(Delivery {
            recipients: reached.len(),
            camera_ids: reached,
            failed_camera_ids,
        })
    }
}
