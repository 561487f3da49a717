use crate::api::responses::HealthResponse;
use crate::config::Config;
use crate::db::repositories::RegistrationStore;
use crate::error::Error;
use crate::geocoding::Geocoder;
use crate::messaging::{EventPublisher, RegistryEvents};
use crate::security::SecurityService;
use crate::services::{OwnerMessagingService, RegistryService};
use anyhow::Result;
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use log::{error, info, warn};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub mod admin_controller;
pub mod geo_controller;
pub mod users_controller;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub registry: RegistryService,
    pub messaging: OwnerMessagingService,
    pub store: Arc<dyn RegistrationStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub security: Arc<SecurityService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn RegistrationStore>,
        geocoder: Arc<dyn Geocoder>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        let events = RegistryEvents::new(publisher);
        Self {
            registry: RegistryService::new(
                Arc::clone(&store),
                events.clone(),
                config.registration.require_email,
            ),
            messaging: OwnerMessagingService::new(Arc::clone(&store), events),
            store,
            geocoder,
            security: Arc::new(SecurityService::new(config.security.clone())),
            config: Arc::new(config),
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Error reply: `{"success": false, "error": "...", "kind": "..."}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    #[serde(rename = "error")]
    pub message: String,
    /// Error variant name, see [`Error::kind`]
    pub kind: &'static str,
    #[serde(skip)]
    pub status: u16,
}

fn kind_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "validation",
        StatusCode::UNAUTHORIZED => "authentication",
        StatusCode::FORBIDDEN => "permission",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::BAD_GATEWAY => "network",
        _ => "internal",
    }
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: kind_for_status(status),
            status: status.as_u16(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn with_kind(mut self, kind: &'static str) -> Self {
        self.kind = kind;
        self
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match &err {
            Error::Validation(_) | Error::Duplicate(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, err.user_message()).with_kind(err.kind())
            }
            Error::NotFound(_) => ApiError::new(StatusCode::NOT_FOUND, err.user_message()),
            Error::Authentication(_) => ApiError::new(StatusCode::UNAUTHORIZED, err.to_string()),
            Error::Permission(_) => ApiError::new(StatusCode::FORBIDDEN, err.user_message()),
            Error::Network(detail) => {
                warn!("Upstream failure: {}", detail);
                ApiError::new(StatusCode::BAD_GATEWAY, err.user_message())
            }
            Error::Cancelled(_)
            | Error::Config(_)
            | Error::Database(_)
            | Error::Messaging(_)
            | Error::Internal(_) => {
                error!("Request failed: {}", err);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(err) = err.downcast_ref::<Error>() {
            return (*err).clone().into();
        }

        error!("Request failed: {:#}", err);
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(self);
        (status, body).into_response()
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = if state.store.health_check().await {
        "ok"
    } else {
        "unavailable"
    };

    Json(HealthResponse {
        status: if database == "ok" { "ok" } else { "degraded" }.to_string(),
        database: database.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// All API routes with CORS applied
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false)
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health))
        .merge(users_controller::create_router())
        .merge(geo_controller::create_router())
        .merge(admin_controller::create_router())
        .with_state(state)
        .layer(cors)
}

pub struct RestApi {
    state: AppState,
}

impl RestApi {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Serve until `shutdown` resolves
    pub async fn run(&self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let api = &self.state.config.api;
        let addr: SocketAddr = format!("{}:{}", api.address, api.port).parse()?;
        let app = build_router(self.state.clone());

        info!("API server listening on {}", addr);

        let listener = TcpListener::bind(addr).await?;
        axum::Server::from_tcp(listener.into_std()?)?
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

/// Unwrap a JSON body, answering malformed input with the error envelope
pub(crate) fn json_body<T>(
    payload: std::result::Result<Json<T>, JsonRejection>,
) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e.body_text())))
}

/// Unwrap query parameters, answering malformed input with the error envelope
pub(crate) fn query_params<T>(
    query: std::result::Result<Query<T>, QueryRejection>,
) -> ApiResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|e| ApiError::bad_request(format!("Invalid query: {}", e.body_text())))
}
