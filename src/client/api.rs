use crate::admin::{AdminCamera, BroadcastRequest, SingleMessageRequest};
use crate::api::responses::{
    CamerasResponse, CoordinatesResponse, DeliveryResponse, ErrorResponse, MessageResponse,
    RegisterResponse, ReverseResponse, UserResponse,
};
use crate::client::OwnerSession;
use crate::db::models::{CameraRegistration, RegistrationFilter};
use crate::error::Error;
use crate::geo::{Distance, LatLng};
use crate::geocoding::{Geocoder, ReverseGeocode};
use crate::registration::{RegisterRequest, UpdateRequest};
use crate::services::Delivery;
use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

/// Request timeout for every call
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Typed client for the registry REST API
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network("Request timed out".to_string())
    } else {
        Error::Network(e.to_string())
    }
}

/// Map an error reply back onto the error taxonomy. A client error's `kind`
/// wins over its status, so a duplicate stays distinct from a validation error.
fn error_for(status: StatusCode, kind: Option<&str>, message: String) -> Error {
    if let (true, Some(kind)) = (status.is_client_error(), kind) {
        return Error::from_kind(kind, message);
    }
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => Error::Validation(message),
        StatusCode::UNAUTHORIZED => Error::Authentication(message),
        StatusCode::FORBIDDEN => Error::Permission(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        s if s.is_server_error() && s != StatusCode::INTERNAL_SERVER_ERROR => {
            Error::Network(message)
        }
        _ => Error::Internal(message),
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(CLIENT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid API URL {}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, Error> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid API path {}: {}", path, e)))
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, Error> {
        Ok(self.client.request(method, self.url(path)?))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!("{} {}", status, response.url());

        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| Error::Network(format!("Malformed response: {}", e)));
        }

        let (kind, message) = match response.json::<ErrorResponse>().await {
            Ok(body) => (body.kind, body.error),
            Err(_) => (
                None,
                status
                    .canonical_reason()
                    .unwrap_or("Request failed")
                    .to_string(),
            ),
        };
        Err(error_for(status, kind.as_deref(), message))
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse> {
        let call = self.request(Method::POST, "api/users/register")?.json(request);
        Ok(self.send(call).await?)
    }

    pub async fn list_users(&self, filter: &RegistrationFilter) -> Result<Vec<CameraRegistration>> {
        let call = self.request(Method::GET, "api/users")?.query(filter);
        Ok(self.send(call).await?)
    }

    pub async fn get_user(&self, id: &Uuid) -> Result<CameraRegistration> {
        let call = self.request(Method::GET, &format!("api/users/{}", id))?;
        let response: UserResponse = self.send(call).await?;
        Ok(response.user)
    }

    pub async fn update_user(
        &self,
        session: &OwnerSession,
        changes: &UpdateRequest,
    ) -> Result<CameraRegistration> {
        let call = self
            .request(Method::PUT, &format!("api/users/{}", session.registration_id))?
            .bearer_auth(&session.token.access_token)
            .json(changes);
        let response: UserResponse = self.send(call).await?;
        Ok(response.user)
    }

    pub async fn delete_user(&self, session: &OwnerSession) -> Result<String> {
        let call = self
            .request(Method::DELETE, &format!("api/users/{}", session.registration_id))?
            .bearer_auth(&session.token.access_token);
        let response: MessageResponse = self.send(call).await?;
        Ok(response.message)
    }

    /// Cameras for the admin map; filtered server-side when `around` is given
    pub async fn admin_cameras(&self, around: Option<(LatLng, Distance)>) -> Result<Vec<AdminCamera>> {
        let mut call = self.request(Method::GET, "api/admin/cameras")?;
        if let Some((center, radius)) = around {
            call = call.query(&[
                ("lat", center.lat),
                ("lng", center.lng),
                ("radius", radius.as_meters()),
            ]);
        }
        let response: CamerasResponse = self.send(call).await?;
        Ok(response.cameras)
    }

    pub async fn message_single(&self, camera_id: Uuid, message: &str) -> Result<Delivery> {
        let body = SingleMessageRequest {
            camera_id,
            message: message.to_string(),
        };
        let call = self
            .request(Method::POST, "api/admin/message/single")?
            .json(&body);
        let response: DeliveryResponse = self.send(call).await?;
        Ok(response.delivery)
    }

    pub async fn message_broadcast(&self, request: &BroadcastRequest) -> Result<Delivery> {
        let call = self
            .request(Method::POST, "api/admin/message/broadcast")?
            .json(request);
        let response: DeliveryResponse = self.send(call).await?;
        Ok(response.delivery)
    }
}

/// Geocoding through the server's proxy routes
#[async_trait]
impl Geocoder for ApiClient {
    async fn reverse(&self, position: LatLng) -> Result<ReverseGeocode> {
        let call = self
            .request(Method::GET, "api/geo/reverse")?
            .query(&[("lat", position.lat), ("lng", position.lng)]);
        let response: ReverseResponse = self.send(call).await?;
        Ok(response.details)
    }

    async fn search_address(&self, address: &str) -> Result<LatLng> {
        let call = self
            .request(Method::GET, "api/geo/search")?
            .query(&[("address", address)]);
        let response: CoordinatesResponse = self.send(call).await?;
        Ok(LatLng::new(response.lat, response.lng)?)
    }

    async fn search_pincode(&self, pincode: &str) -> Result<LatLng> {
        let call = self
            .request(Method::GET, "api/geo/pincode")?
            .query(&[("pincode", pincode)]);
        let response: CoordinatesResponse = self.send(call).await?;
        Ok(LatLng::new(response.lat, response.lng)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_join_under_a_prefixed_base() {
        let client = ApiClient::new("http://localhost:5000/shield").unwrap();
        assert_eq!(
            client.url("/api/users").unwrap().as_str(),
            "http://localhost:5000/shield/api/users"
        );

        let client = ApiClient::new("http://localhost:5000").unwrap();
        assert_eq!(
            client.url("api/admin/cameras").unwrap().as_str(),
            "http://localhost:5000/api/admin/cameras"
        );
    }

    #[test]
    fn error_statuses_map_to_error_kinds() {
        assert!(matches!(
            error_for(StatusCode::BAD_REQUEST, None, "Name is required".to_string()),
            Error::Validation(_)
        ));
        assert!(matches!(
            error_for(StatusCode::NOT_FOUND, None, "User not found".to_string()),
            Error::NotFound(_)
        ));
        assert!(matches!(
            error_for(StatusCode::BAD_GATEWAY, None, "upstream".to_string()),
            Error::Network(_)
        ));
        assert!(matches!(
            error_for(StatusCode::INTERNAL_SERVER_ERROR, Some("database"), "oops".to_string()),
            Error::Internal(_)
        ));
    }

    #[test]
    fn duplicate_kind_survives_the_round_trip() {
        let err = error_for(
            StatusCode::BAD_REQUEST,
            Some("duplicate"),
            "This email is already registered".to_string(),
        );
        assert_eq!(
            err,
            Error::Duplicate("This email is already registered".to_string())
        );
        assert!(matches!(
            error_for(StatusCode::BAD_REQUEST, Some("validation"), "Name is required".to_string()),
            Error::Validation(_)
        ));
    }

    #[test]
    fn bad_base_url_is_a_config_error() {
        let err = ApiClient::new("not a url").err().unwrap();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Config(_))));
    }
}
