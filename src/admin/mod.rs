//! Admin map: camera listing, proximity search and owner messaging requests.

use crate::config::MapConfig;
use crate::db::models::{CameraRegistration, CameraType, CoverageArea};
use crate::geo::{LatLng, Located, Ranked};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod resolver;
pub mod search;

pub use resolver::{CenterResolver, FixedPosition, PositionSource};
pub use search::{AdminMap, MapStats, MapView, SearchMode, SearchState, SearchTicket};

/// A camera as the admin map shows it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminCamera {
    pub id: Uuid,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Short location label
    pub location: String,
    #[serde(default)]
    pub camera_type: CameraType,
    #[serde(default)]
    pub coverage_area: CoverageArea,
    /// Distance from the search center, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl From<&CameraRegistration> for AdminCamera {
    fn from(registration: &CameraRegistration) -> Self {
        Self {
            id: registration.id,
            name: registration.name.clone(),
            lat: registration.location.0.lat,
            lng: registration.location.0.lng,
            location: registration.location_label(),
            camera_type: registration.camera_type,
            coverage_area: registration.coverage_area,
            distance_m: None,
        }
    }
}

impl From<Ranked<CameraRegistration>> for AdminCamera {
    fn from(ranked: Ranked<CameraRegistration>) -> Self {
        Self {
            distance_m: Some(ranked.distance.as_meters().round()),
            ..AdminCamera::from(&ranked.item)
        }
    }
}

impl Located for AdminCamera {
    fn position(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lng: self.lng,
        }
    }
}

impl AdminCamera {
    pub fn marker_icon<'a>(&self, map: &'a MapConfig) -> Option<&'a str> {
        map.marker_icon(&self.camera_type.to_string())
    }
}

/// Body of `POST /api/admin/message/single`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleMessageRequest {
    pub camera_id: Uuid,
    pub message: String,
}

/// Body of `POST /api/admin/message/broadcast`. Radius is in meters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    pub center: LatLng,
    pub radius: f64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_ids: Option<Vec<Uuid>>,
}
