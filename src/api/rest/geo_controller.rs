use crate::api::responses::{CoordinatesResponse, ReverseResponse};
use crate::api::rest::{query_params, ApiError, ApiResult, AppState};
use crate::geo::LatLng;
use crate::geocoding::is_valid_pincode;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

/// Create the geocoding proxy routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/geo/reverse", get(reverse))
        .route("/api/geo/search", get(search_address))
        .route("/api/geo/pincode", get(search_pincode))
}

/// Coordinates arrive as text so a bad value gets our own error reply
#[derive(Debug, Deserialize)]
pub struct ReverseParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PincodeParams {
    pub pincode: Option<String>,
}

fn position(params: &ReverseParams) -> ApiResult<LatLng> {
    let (Some(lat), Some(lng)) = (params.lat.as_deref(), params.lng.as_deref()) else {
        return Err(ApiError::bad_request("Latitude and longitude are required"));
    };

    let lat = lat.trim().parse::<f64>();
    let lng = lng.trim().parse::<f64>();
    match (lat, lng) {
        (Ok(lat), Ok(lng)) => Ok(LatLng::new(lat, lng)?),
        _ => Err(ApiError::bad_request("Invalid coordinates")),
    }
}

/// Describe the address at a coordinate
pub async fn reverse(
    State(state): State<AppState>,
    query: Result<Query<ReverseParams>, QueryRejection>,
) -> ApiResult<Json<ReverseResponse>> {
    let params = query_params(query)?;
    let coordinates = position(&params)?;
    let details = state.geocoder.reverse(coordinates).await?;

    Ok(Json(ReverseResponse {
        success: true,
        details,
        coordinates,
    }))
}

pub async fn search_address(
    State(state): State<AppState>,
    query: Result<Query<AddressParams>, QueryRejection>,
) -> ApiResult<Json<CoordinatesResponse>> {
    let params = query_params(query)?;
    let address = params
        .address
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("Address is required"))?;

    let found = state.geocoder.search_address(address).await?;
    Ok(Json(CoordinatesResponse {
        success: true,
        lat: found.lat,
        lng: found.lng,
    }))
}

pub async fn search_pincode(
    State(state): State<AppState>,
    query: Result<Query<PincodeParams>, QueryRejection>,
) -> ApiResult<Json<CoordinatesResponse>> {
    let params = query_params(query)?;
    let pincode = params.pincode.unwrap_or_default();
    if !is_valid_pincode(&pincode) {
        return Err(ApiError::bad_request("Please enter a valid 6-digit pincode"));
    }

    let found = state.geocoder.search_pincode(pincode.trim()).await?;
    Ok(Json(CoordinatesResponse {
        success: true,
        lat: found.lat,
        lng: found.lng,
    }))
}
