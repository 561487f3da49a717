use crate::admin::{AdminCamera, BroadcastRequest, SingleMessageRequest};
use crate::api::responses::{CamerasResponse, DeliveryResponse};
use crate::api::rest::{json_body, query_params, ApiError, ApiResult, AppState};
use crate::db::models::RegistrationFilter;
use crate::geo::{Distance, LatLng};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use serde::Deserialize;

/// Create the admin map routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/cameras", get(list_cameras))
        .route("/api/admin/message/single", post(message_single))
        .route("/api/admin/message/broadcast", post(message_broadcast))
}

/// Optional search center; radius in meters
#[derive(Debug, Deserialize)]
pub struct CameraQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius: Option<f64>,
}

/// All cameras, or those within `radius` meters of `lat`/`lng` nearest first
pub async fn list_cameras(
    State(state): State<AppState>,
    query: Result<Query<CameraQuery>, QueryRejection>,
) -> ApiResult<Json<CamerasResponse>> {
    let query = query_params(query)?;

    let cameras: Vec<AdminCamera> = match (query.lat, query.lng, query.radius) {
        (None, None, None) => state
            .registry
            .list(&RegistrationFilter::default())
            .await?
            .iter()
            .map(AdminCamera::from)
            .collect(),
        (Some(lat), Some(lng), radius) => {
            let center = LatLng::new(lat, lng)?;
            let radius = match radius {
                Some(meters) if meters.is_finite() && meters >= 0.0 => Distance::meters(meters),
                Some(_) => return Err(ApiError::bad_request("Radius must be a positive number")),
                None => Distance::km(state.config.map.default_radius_km),
            };
            state
                .registry
                .nearby(center, radius)
                .await?
                .into_iter()
                .map(AdminCamera::from)
                .collect()
        }
        _ => {
            return Err(ApiError::bad_request(
                "Both lat and lng are required for a radius search",
            ))
        }
    };

    Ok(Json(CamerasResponse {
        success: true,
        cameras,
    }))
}

/// Queue a message for one camera owner
pub async fn message_single(
    State(state): State<AppState>,
    payload: Result<Json<SingleMessageRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let request = json_body(payload)?;
    let delivery = state
        .messaging
        .send_single(&request.camera_id, &request.message)
        .await?;

    Ok(Json(DeliveryResponse {
        success: true,
        delivery,
    }))
}

/// Queue a message for every owner within the radius
pub async fn message_broadcast(
    State(state): State<AppState>,
    payload: Result<Json<BroadcastRequest>, JsonRejection>,
) -> ApiResult<Json<DeliveryResponse>> {
    let request = json_body(payload)?;
    let center = LatLng::new(request.center.lat, request.center.lng)?;
    // An empty selection means "everyone in range"
    let camera_ids = request.camera_ids.as_deref().filter(|ids| !ids.is_empty());

    let delivery = state
        .messaging
        .broadcast(
            center,
            Distance::meters(request.radius),
            &request.message,
            camera_ids,
        )
        .await?;

    info!(
        "Broadcast from admin map reached {} owners",
        delivery.recipients
    );

    Ok(Json(DeliveryResponse {
        success: true,
        delivery,
    }))
}
