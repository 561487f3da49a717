use crate::api::responses::{MessageResponse, RegisterResponse, UserResponse};
use crate::api::rest::{json_body, query_params, ApiError, ApiResult, AppState};
use crate::db::models::{CameraRegistration, RegistrationFilter};
use crate::registration::{RegisterRequest, UpdateRequest};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use uuid::Uuid;

/// Create the owner-facing registration routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/api/users/register", post(register))
        .route("/api/users", get(list_users))
        .route("/api/users/reverse", get(super::geo_controller::reverse))
        .route(
            "/api/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

fn registration_id(path: Result<Path<Uuid>, PathRejection>) -> ApiResult<Uuid> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::bad_request("Invalid registration id"))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Register a camera and hand back an owner session token
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let request = json_body(payload)?;
    let registration = state.registry.register(&request).await?;
    let token = state.security.issue_token(&registration)?;

    Ok(Json(RegisterResponse {
        success: true,
        message: "Camera registered successfully".to_string(),
        user: registration.summary(),
        token,
    }))
}

/// List registrations, optionally filtered by pincode and locality
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<RegistrationFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<CameraRegistration>>> {
    let filter = query_params(query)?;
    let registrations = state.registry.list(&filter).await?;
    Ok(Json(registrations))
}

pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<UserResponse>> {
    let id = registration_id(path)?;
    let user = state.registry.get(&id).await?;
    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
    payload: Result<Json<UpdateRequest>, JsonRejection>,
) -> ApiResult<Json<UserResponse>> {
    let id = registration_id(path)?;
    state.security.authorize_owner(bearer(&headers), &id)?;

    let request = json_body(payload)?;
    let user = state.registry.update(&id, &request).await?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    headers: HeaderMap,
) -> ApiResult<Json<MessageResponse>> {
    let id = registration_id(path)?;
    state.security.authorize_owner(bearer(&headers), &id)?;

    state.registry.delete(&id).await?;
    info!("Owner removed registration {}", id);

    Ok(Json(MessageResponse {
        success: true,
        message: "Registration deleted successfully".to_string(),
    }))
}
