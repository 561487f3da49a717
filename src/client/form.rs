//! Registration form model. One parameterized form replaces the separate
//! full and simplified registration pages.

use crate::api::responses::RegisterResponse;
use crate::client::{ApiClient, OwnerSession};
use crate::config::RegistrationConfig;
use crate::db::models::RegistrationSummary;
use crate::error::Error;
use crate::geo::LatLng;
use crate::geocoding::{is_valid_pincode, Geocoder, ReverseGeocode};
use crate::registration::{validate_registration, RegisterRequest};
use log::{info, warn};
use serde_json::json;

/// How the camera position is captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocationMode {
    /// Device position or a point picked on the map
    #[default]
    Coordinates,
    /// A postal code geocoded to its center
    Pincode,
}

/// Which optional fields the form collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormConfig {
    pub require_email: bool,
    pub collect_camera_type: bool,
    pub collect_coverage_area: bool,
    pub location_mode: LocationMode,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            require_email: true,
            collect_camera_type: true,
            collect_coverage_area: true,
            location_mode: LocationMode::Coordinates,
        }
    }
}

impl FormConfig {
    /// The simplified form: contact details and a position only
    pub fn simple() -> Self {
        Self {
            collect_camera_type: false,
            collect_coverage_area: false,
            ..Self::default()
        }
    }

    pub fn for_registration(config: &RegistrationConfig) -> Self {
        Self {
            require_email: config.require_email,
            ..Self::default()
        }
    }
}

/// Values typed into the form so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub camera_type: String,
    pub coverage_area: String,
    pub pincode: String,
    pub locality: String,
    pub city: String,
    pub state: String,
    pub formatted_address: String,
    pub location: Option<LatLng>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitStatus {
    Editing,
    Submitting,
    Registered(RegistrationSummary),
    /// User-facing failure message; the draft is still there
    Failed(String),
}

pub struct RegistrationForm {
    config: FormConfig,
    draft: RegistrationDraft,
    status: SubmitStatus,
}

impl RegistrationForm {
    pub fn new(config: FormConfig) -> Self {
        Self {
            config,
            draft: RegistrationDraft::default(),
            status: SubmitStatus::Editing,
        }
    }

    pub fn config(&self) -> FormConfig {
        self.config
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut RegistrationDraft {
        &mut self.draft
    }

    pub fn status(&self) -> &SubmitStatus {
        &self.status
    }

    pub fn is_submitting(&self) -> bool {
        self.status == SubmitStatus::Submitting
    }

    pub fn set_location(&mut self, position: LatLng) {
        self.draft.location = Some(position);
    }

    /// Merge address details into the draft. Only location fields change.
    pub fn apply_reverse_geocode(&mut self, details: &ReverseGeocode) {
        self.draft.pincode = details.pincode.clone();
        self.draft.city = details.city.clone();
        self.draft.state = details.state.clone();
        self.draft.locality = details.locality.clone();
        self.draft.formatted_address = details.formatted_address.clone();
    }

    /// Capture a position and fill in its address. A failed lookup keeps the
    /// position and leaves the rest of the form editable.
    pub async fn locate(&mut self, geocoder: &dyn Geocoder, position: LatLng) -> Result<(), Error> {
        self.set_location(position);
        match geocoder.reverse(position).await {
            Ok(details) => {
                self.apply_reverse_geocode(&details);
                Ok(())
            }
            Err(e) => {
                let err = Error::from_anyhow(e);
                warn!("Reverse geocoding failed: {}", err);
                Err(err)
            }
        }
    }

    /// Resolve the draft pincode to a position
    pub async fn locate_by_pincode(&mut self, geocoder: &dyn Geocoder) -> Result<LatLng, Error> {
        let pincode = self.draft.pincode.trim().to_string();
        if !is_valid_pincode(&pincode) {
            return Err(Error::Validation(
                "Please enter a valid 6-digit pincode".to_string(),
            ));
        }
        let position = geocoder
            .search_pincode(&pincode)
            .await
            .map_err(Error::from_anyhow)?;
        self.set_location(position);
        Ok(position)
    }

    /// The request this draft would submit, after the shared validation
    pub fn to_request(&self) -> Result<RegisterRequest, Error> {
        if self.config.location_mode == LocationMode::Pincode
            && !is_valid_pincode(&self.draft.pincode)
        {
            return Err(Error::Validation(
                "Please enter a valid 6-digit pincode".to_string(),
            ));
        }

        let optional = |collect: bool, value: &str| {
            (collect && !value.trim().is_empty()).then(|| value.to_string())
        };

        let request = RegisterRequest {
            name: Some(self.draft.name.clone()),
            email: optional(true, &self.draft.email),
            phone: Some(self.draft.phone.clone()),
            lat: self.draft.location.map(|p| json!(p.lat)),
            lng: self.draft.location.map(|p| json!(p.lng)),
            camera_type: optional(self.config.collect_camera_type, &self.draft.camera_type),
            coverage_area: optional(self.config.collect_coverage_area, &self.draft.coverage_area),
            pincode: optional(true, &self.draft.pincode),
            locality: optional(true, &self.draft.locality),
        };

        validate_registration(&request, self.config.require_email)?;
        Ok(request)
    }

    /// Start a submission. Refused while another one is outstanding.
    pub fn begin_submit(&mut self) -> Result<RegisterRequest, Error> {
        if self.is_submitting() {
            return Err(Error::Validation(
                "Registration is already being submitted".to_string(),
            ));
        }
        let request = self.to_request()?;
        self.status = SubmitStatus::Submitting;
        Ok(request)
    }

    /// Clear the form after the server accepted it
    pub fn finish_success(&mut self, user: RegistrationSummary) {
        self.draft = RegistrationDraft::default();
        self.status = SubmitStatus::Registered(user);
    }

    /// Keep the draft and show why it failed
    pub fn finish_failure(&mut self, error: &Error) {
        self.status = SubmitStatus::Failed(error.user_message());
    }

    /// Submit through the API and return the owner session on success
    pub async fn submit(&mut self, client: &ApiClient) -> Result<OwnerSession, Error> {
        let request = match self.begin_submit() {
            Ok(request) => request,
            Err(e) => {
                if !self.is_submitting() {
                    self.finish_failure(&e);
                }
                return Err(e);
            }
        };

        match client.register(&request).await {
            Ok(RegisterResponse { user, token, .. }) => {
                info!("Registered camera {}", user.id);
                let session = OwnerSession {
                    registration_id: user.id,
                    token,
                };
                self.finish_success(user);
                Ok(session)
            }
            Err(e) => {
                let err = Error::from_anyhow(e);
                self.finish_failure(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::StaticGeocoder;
    use chrono::Utc;
    use uuid::Uuid;

    const JAIPUR: LatLng = LatLng {
        lat: 26.9124,
        lng: 75.7873,
    };

    fn filled(config: FormConfig) -> RegistrationForm {
        let mut form = RegistrationForm::new(config);
        let draft = form.draft_mut();
        draft.name = "Aarav Mehta".to_string();
        draft.email = "Aarav@Example.com".to_string();
        draft.phone = "9000000001".to_string();
        draft.camera_type = "dome".to_string();
        draft.coverage_area = "front-gate".to_string();
        form.set_location(JAIPUR);
        form
    }

    fn summary() -> RegistrationSummary {
        RegistrationSummary {
            id: Uuid::new_v4(),
            name: "Aarav Mehta".to_string(),
            email: Some("aarav@example.com".to_string()),
            phone: "9000000001".to_string(),
            camera_type: Default::default(),
            coverage_area: Default::default(),
            preferences: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn simple_form_drops_uncollected_fields() {
        let request = filled(FormConfig::simple()).to_request().unwrap();
        assert_eq!(request.camera_type, None);
        assert_eq!(request.coverage_area, None);
        assert_eq!(request.email.as_deref(), Some("Aarav@Example.com"));
    }

    #[test]
    fn missing_position_fails_before_submission() {
        let mut form = filled(FormConfig::default());
        form.draft_mut().location = None;
        assert!(form.begin_submit().is_err());
        assert!(!form.is_submitting());
    }

    #[test]
    fn second_submit_is_blocked_until_finished() {
        let mut form = filled(FormConfig::default());
        assert!(form.begin_submit().is_ok());
        assert!(form.begin_submit().is_err());

        form.finish_failure(&Error::Duplicate("This email is already registered".to_string()));
        assert_eq!(
            form.status(),
            &SubmitStatus::Failed("This email is already registered".to_string())
        );
        assert_eq!(form.draft().name, "Aarav Mehta");
        assert!(form.begin_submit().is_ok());
    }

    #[test]
    fn success_clears_the_draft() {
        let mut form = filled(FormConfig::default());
        form.begin_submit().unwrap();
        form.finish_success(summary());
        assert_eq!(form.draft(), &RegistrationDraft::default());
        assert!(matches!(form.status(), SubmitStatus::Registered(_)));
    }

    #[test]
    fn pincode_mode_requires_six_digits() {
        let mut form = filled(FormConfig {
            location_mode: LocationMode::Pincode,
            ..FormConfig::default()
        });
        form.draft_mut().pincode = "3020".to_string();
        assert!(form.to_request().is_err());

        form.draft_mut().pincode = "302001".to_string();
        assert_eq!(form.to_request().unwrap().pincode.as_deref(), Some("302001"));
    }

    #[tokio::test]
    async fn locate_merges_address_without_touching_contact_fields() {
        let mut form = filled(FormConfig::default());
        let geocoder = StaticGeocoder::new().with_reverse(ReverseGeocode {
            pincode: "302001".to_string(),
            city: "Jaipur".to_string(),
            state: "Rajasthan".to_string(),
            locality: "C-Scheme".to_string(),
            formatted_address: "C-Scheme, Jaipur".to_string(),
        });

        form.locate(&geocoder, JAIPUR).await.unwrap();
        assert_eq!(form.draft().pincode, "302001");
        assert_eq!(form.draft().locality, "C-Scheme");
        assert_eq!(form.draft().name, "Aarav Mehta");
        assert_eq!(form.draft().location, Some(JAIPUR));
    }

    #[tokio::test]
    async fn failed_lookup_keeps_the_position() {
        let mut form = RegistrationForm::new(FormConfig::default());
        let err = form.locate(&StaticGeocoder::new(), JAIPUR).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(form.draft().location, Some(JAIPUR));
        assert_eq!(form.draft().pincode, "");
    }

    #[tokio::test]
    async fn pincode_lookup_sets_position() {
        let mut form = RegistrationForm::new(FormConfig {
            location_mode: LocationMode::Pincode,
            ..FormConfig::default()
        });
        form.draft_mut().pincode = "302001".to_string();
        let geocoder = StaticGeocoder::new().with_pincode("302001", JAIPUR);

        assert_eq!(form.locate_by_pincode(&geocoder).await.unwrap(), JAIPUR);
        assert_eq!(form.draft().location, Some(JAIPUR));
    }
}
