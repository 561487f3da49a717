//! Request shapes and validation for registering and editing a camera.
//!
//! The same rules run in the form model before submission and in the service
//! before anything is persisted.

use crate::db::models::{
    CameraType, CoverageArea, NewRegistration, RegistrationChanges, SharingPreferences,
};
use crate::error::Error;
use crate::geo::LatLng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /api/users/register`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Number or numeric string
    pub lat: Option<Value>,
    /// Number or numeric string
    pub lng: Option<Value>,
    pub camera_type: Option<String>,
    pub coverage_area: Option<String>,
    pub pincode: Option<String>,
    pub locality: Option<String>,
}

/// Body of `PUT /api/users/:id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub camera_type: Option<String>,
    pub coverage_area: Option<String>,
    pub preferences: Option<SharingPreferences>,
}

/// Collects every failing field so one response can list them all
#[derive(Debug, Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, problem: impl Into<String>) {
        self.0.push(problem.into());
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, Error> {
        if self.0.is_empty() {
            Ok(value())
        } else {
            Err(Error::Validation(self.0.join("; ")))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Trim and lower-case an email for storage and comparison
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

/// Coordinate parsing outcome
enum Coordinate {
    Missing,
    Invalid,
    Value(f64),
}

fn coordinate(value: Option<&Value>) -> Coordinate {
    match value {
        None | Some(Value::Null) => Coordinate::Missing,
        Some(Value::Number(n)) => n.as_f64().map_or(Coordinate::Invalid, Coordinate::Value),
        Some(Value::String(s)) if s.trim().is_empty() => Coordinate::Missing,
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map_or(Coordinate::Invalid, Coordinate::Value),
        Some(_) => Coordinate::Invalid,
    }
}

fn parse_tag<T: std::str::FromStr<Err = Error> + Default>(
    value: Option<&str>,
    problems: &mut Problems,
) -> T {
    match value.map(str::parse::<T>) {
        Some(Ok(tag)) => tag,
        Some(Err(Error::Validation(msg))) => {
            problems.push(msg);
            T::default()
        }
        Some(Err(e)) => {
            problems.push(e.to_string());
            T::default()
        }
        None => T::default(),
    }
}

/// Validate a registration request.
///
/// With `require_email` false an email is still accepted (and normalized) but
/// may be omitted.
pub fn validate_registration(
    request: &RegisterRequest,
    require_email: bool,
) -> Result<NewRegistration, Error> {
    let mut problems = Problems::default();

    let name = non_blank(request.name.as_deref());
    if name.is_none() {
        problems.push("Name is required");
    }

    let email = non_blank(request.email.as_deref()).map(|e| normalize_email(&e));
    match &email {
        None if require_email => problems.push("Email is required"),
        Some(email) if !looks_like_email(email) => problems.push("Email address is invalid"),
        _ => {}
    }

    let phone = non_blank(request.phone.as_deref());
    if phone.is_none() {
        problems.push("Phone number is required");
    }

    let mut location = None;
    match (coordinate(request.lat.as_ref()), coordinate(request.lng.as_ref())) {
        (Coordinate::Value(lat), Coordinate::Value(lng)) => match LatLng::new(lat, lng) {
            Ok(position) => location = Some(position),
            Err(Error::Validation(msg)) => problems.push(msg),
            Err(e) => problems.push(e.to_string()),
        },
        (Coordinate::Missing, _) | (_, Coordinate::Missing) => {
            problems.push("Location coordinates are required")
        }
        _ => problems.push("Invalid coordinates"),
    }

    let camera_type: CameraType = parse_tag(request.camera_type.as_deref(), &mut problems);
    let coverage_area: CoverageArea = parse_tag(request.coverage_area.as_deref(), &mut problems);

    problems.into_result(|| NewRegistration {
        name: name.unwrap_or_default(),
        email,
        phone: phone.unwrap_or_default(),
        camera_type,
        coverage_area,
        pincode: non_blank(request.pincode.as_deref()).unwrap_or_default(),
        locality: non_blank(request.locality.as_deref()).unwrap_or_default(),
        location: location.unwrap_or(LatLng { lat: 0.0, lng: 0.0 }),
    })
}

/// Validate a profile update. Fields that are present must be valid; blank
/// name or phone are rejected rather than clearing the field.
pub fn validate_update(request: &UpdateRequest) -> Result<RegistrationChanges, Error> {
    let mut problems = Problems::default();

    let name = request.name.as_deref().map(str::trim);
    if name == Some("") {
        problems.push("Name cannot be empty");
    }

    let phone = request.phone.as_deref().map(str::trim);
    if phone == Some("") {
        problems.push("Phone number cannot be empty");
    }

    let email = request.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        if !looks_like_email(email) {
            problems.push("Email address is invalid");
        }
    }

    let camera_type = request
        .camera_type
        .as_deref()
        .map(|t| parse_tag::<CameraType>(Some(t), &mut problems));
    let coverage_area = request
        .coverage_area
        .as_deref()
        .map(|a| parse_tag::<CoverageArea>(Some(a), &mut problems));

    problems.into_result(|| RegistrationChanges {
        name: name.map(str::to_string),
        email,
        phone: phone.map(str::to_string),
        camera_type,
        coverage_area,
        preferences: request.preferences,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete() -> RegisterRequest {
        RegisterRequest {
            name: Some("  Rohan Singh ".to_string()),
            email: Some(" Rohan.Singh3@Example.com ".to_string()),
            phone: Some("9000000003".to_string()),
            lat: Some(json!(26.9100)),
            lng: Some(json!("75.8095")),
            camera_type: Some("ptz".to_string()),
            coverage_area: Some("street-facing".to_string()),
            pincode: None,
            locality: Some("Malviya Nagar".to_string()),
        }
    }

    #[test]
    fn complete_request_is_normalized() {
        let registration = validate_registration(&complete(), true).unwrap();
        assert_eq!(registration.name, "Rohan Singh");
        assert_eq!(registration.email.as_deref(), Some("rohan.singh3@example.com"));
        assert_eq!(registration.camera_type, CameraType::Ptz);
        assert_eq!(registration.coverage_area, CoverageArea::StreetFacing);
        assert_eq!(registration.location, LatLng { lat: 26.91, lng: 75.8095 });
        assert_eq!(registration.pincode, "");
    }

    #[test]
    fn every_missing_field_is_listed() {
        let err = validate_registration(&RegisterRequest::default(), true).unwrap_err();
        let Error::Validation(msg) = err else {
            panic!("expected validation error");
        };
        assert!(msg.contains("Name is required"));
        assert!(msg.contains("Email is required"));
        assert!(msg.contains("Phone number is required"));
        assert!(msg.contains("Location coordinates are required"));
    }

    #[test]
    fn email_is_optional_when_not_tracked() {
        let mut request = complete();
        request.email = None;
        assert!(validate_registration(&request, false).is_ok());
        assert!(validate_registration(&request, true).is_err());
    }

    #[test]
    fn non_numeric_coordinates_are_rejected() {
        let mut request = complete();
        request.lat = Some(json!("north"));
        assert_eq!(
            validate_registration(&request, true).unwrap_err(),
            Error::Validation("Invalid coordinates".to_string())
        );

        request.lat = Some(json!([26.9]));
        assert!(validate_registration(&request, true).is_err());
    }

    #[test]
    fn zero_is_a_valid_coordinate() {
        let mut request = complete();
        request.lat = Some(json!(0));
        request.lng = Some(json!(0.0));
        let registration = validate_registration(&request, true).unwrap();
        assert_eq!(registration.location, LatLng { lat: 0.0, lng: 0.0 });
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut request = complete();
        request.lng = Some(json!(181.0));
        assert!(matches!(
            validate_registration(&request, true),
            Err(Error::Validation(msg)) if msg.contains("out of range")
        ));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let mut request = complete();
        request.camera_type = Some("thermal".to_string());
        request.coverage_area = Some("roof".to_string());
        let Err(Error::Validation(msg)) = validate_registration(&request, true) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("Unknown camera type: thermal"));
        assert!(msg.contains("Unknown coverage area: roof"));
    }

    #[test]
    fn update_rejects_blank_required_fields() {
        let request = UpdateRequest {
            name: Some("   ".to_string()),
            phone: Some(String::new()),
            ..Default::default()
        };
        let Err(Error::Validation(msg)) = validate_update(&request) else {
            panic!("expected validation error");
        };
        assert!(msg.contains("Name cannot be empty"));
        assert!(msg.contains("Phone number cannot be empty"));
    }

    #[test]
    fn update_keeps_absent_fields_absent() {
        let request = UpdateRequest {
            coverage_area: Some("".to_string()),
            email: Some("NEW@x.com".to_string()),
            ..Default::default()
        };
        let changes = validate_update(&request).unwrap();
        assert_eq!(changes.name, None);
        assert_eq!(changes.email.as_deref(), Some("new@x.com"));
        assert_eq!(changes.coverage_area, Some(CoverageArea::Unspecified));
        assert_eq!(changes.camera_type, None);
    }
}
