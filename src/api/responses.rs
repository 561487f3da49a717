//! JSON bodies returned by the REST API. Shared with the HTTP client.

use crate::admin::AdminCamera;
use crate::db::models::{CameraRegistration, RegistrationSummary};
use crate::geo::LatLng;
use crate::geocoding::ReverseGeocode;
use crate::security::OwnerToken;
use crate::services::Delivery;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: RegistrationSummary,
    pub token: OwnerToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: CameraRegistration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseResponse {
    pub success: bool,
    #[serde(flatten)]
    pub details: ReverseGeocode,
    pub coordinates: LatLng,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatesResponse {
    pub success: bool,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamerasResponse {
    pub success: bool,
    pub cameras: Vec<AdminCamera>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub success: bool,
    #[serde(flatten)]
    pub delivery: Delivery,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub version: String,
}

/// Error envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Error variant name; absent from older servers
    #[serde(default)]
    pub kind: Option<String>,
}
