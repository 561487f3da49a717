//! Client-side pieces: the HTTP API client and the registration form model.

use crate::security::OwnerToken;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod api;
pub mod form;

pub use api::ApiClient;
pub use form::{FormConfig, LocationMode, RegistrationDraft, RegistrationForm, SubmitStatus};

/// Proof of ownership kept by the client after registering. Passed
/// explicitly to the calls that edit or delete the registration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSession {
    pub registration_id: Uuid,
    pub token: OwnerToken,
}
