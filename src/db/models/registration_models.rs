use crate::error::Error;
use crate::geo::{LatLng, Located};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Camera hardware kind. `Unspecified` serializes as "".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    Dome,
    Bullet,
    Ptz,
    Ip,
    Analog,
    Other,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl CameraType {
    pub const ALL: [CameraType; 6] = [
        CameraType::Dome,
        CameraType::Bullet,
        CameraType::Ptz,
        CameraType::Ip,
        CameraType::Analog,
        CameraType::Other,
    ];

    /// Human-readable label for lists and popups
    pub fn label(&self) -> &'static str {
        match self {
            CameraType::Dome => "Dome Camera",
            CameraType::Bullet => "Bullet Camera",
            CameraType::Ptz => "PTZ Camera",
            CameraType::Ip => "IP Camera",
            CameraType::Analog => "Analog Camera",
            CameraType::Other => "Other",
            CameraType::Unspecified => "Not specified",
        }
    }
}

impl Display for CameraType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraType::Dome => write!(f, "dome"),
            CameraType::Bullet => write!(f, "bullet"),
            CameraType::Ptz => write!(f, "ptz"),
            CameraType::Ip => write!(f, "ip"),
            CameraType::Analog => write!(f, "analog"),
            CameraType::Other => write!(f, "other"),
            CameraType::Unspecified => Ok(()),
        }
    }
}

impl FromStr for CameraType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(CameraType::Unspecified),
            "dome" => Ok(CameraType::Dome),
            "bullet" => Ok(CameraType::Bullet),
            "ptz" => Ok(CameraType::Ptz),
            "ip" => Ok(CameraType::Ip),
            "analog" => Ok(CameraType::Analog),
            "other" => Ok(CameraType::Other),
            other => Err(Error::Validation(format!("Unknown camera type: {}", other))),
        }
    }
}

/// Physical facing/zone a camera covers. `Unspecified` serializes as "".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CoverageArea {
    FrontGate,
    BackGate,
    Parking,
    StreetFacing,
    InsidePremises,
    CornerView,
    FullCoverage,
    #[default]
    #[serde(rename = "")]
    Unspecified,
}

impl CoverageArea {
    pub const ALL: [CoverageArea; 7] = [
        CoverageArea::FrontGate,
        CoverageArea::BackGate,
        CoverageArea::Parking,
        CoverageArea::StreetFacing,
        CoverageArea::InsidePremises,
        CoverageArea::CornerView,
        CoverageArea::FullCoverage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CoverageArea::FrontGate => "Front Gate/Entrance",
            CoverageArea::BackGate => "Back Gate/Exit",
            CoverageArea::Parking => "Parking Area",
            CoverageArea::StreetFacing => "Street Facing",
            CoverageArea::InsidePremises => "Inside Premises",
            CoverageArea::CornerView => "Corner/Side View",
            CoverageArea::FullCoverage => "360° Full Coverage",
            CoverageArea::Unspecified => "Not specified",
        }
    }
}

impl Display for CoverageArea {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoverageArea::FrontGate => write!(f, "front-gate"),
            CoverageArea::BackGate => write!(f, "back-gate"),
            CoverageArea::Parking => write!(f, "parking"),
            CoverageArea::StreetFacing => write!(f, "street-facing"),
            CoverageArea::InsidePremises => write!(f, "inside-premises"),
            CoverageArea::CornerView => write!(f, "corner-view"),
            CoverageArea::FullCoverage => write!(f, "full-coverage"),
            CoverageArea::Unspecified => Ok(()),
        }
    }
}

impl FromStr for CoverageArea {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(CoverageArea::Unspecified),
            "front-gate" => Ok(CoverageArea::FrontGate),
            "back-gate" => Ok(CoverageArea::BackGate),
            "parking" => Ok(CoverageArea::Parking),
            "street-facing" => Ok(CoverageArea::StreetFacing),
            "inside-premises" => Ok(CoverageArea::InsidePremises),
            "corner-view" => Ok(CoverageArea::CornerView),
            "full-coverage" => Ok(CoverageArea::FullCoverage),
            other => Err(Error::Validation(format!("Unknown coverage area: {}", other))),
        }
    }
}

/// GeoJSON point. Coordinates are `[longitude, latitude]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "GeoJsonPoint", into = "GeoJsonPoint")]
pub struct GeoPoint(pub LatLng);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeoJsonPoint {
    #[serde(rename = "type")]
    kind: String,
    coordinates: [f64; 2],
}

impl TryFrom<GeoJsonPoint> for GeoPoint {
    type Error = Error;

    fn try_from(point: GeoJsonPoint) -> Result<Self, Self::Error> {
        if point.kind != "Point" {
            return Err(Error::Validation(format!(
                "Unsupported GeoJSON type: {}",
                point.kind
            )));
        }
        let [lng, lat] = point.coordinates;
        Ok(GeoPoint(LatLng::new(lat, lng)?))
    }
}

impl From<GeoPoint> for GeoJsonPoint {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [point.0.lng, point.0.lat],
        }
    }
}

impl GeoPoint {
    pub fn to_geojson(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "Point",
            "coordinates": [self.0.lng, self.0.lat],
        })
    }
}

/// Owner sharing preferences. Stored as given; nothing acts on them yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SharingPreferences {
    pub emergency_live: bool,
    pub incident_clips: bool,
    pub auto_approve: bool,
}

/// A persisted camera-owner record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraRegistration {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub camera_type: CameraType,
    pub coverage_area: CoverageArea,
    pub pincode: String,
    pub locality: String,
    pub location: GeoPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<SharingPreferences>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Located for CameraRegistration {
    fn position(&self) -> LatLng {
        self.location.0
    }
}

impl CameraRegistration {
    /// Short location label used by the admin list ("locality, pincode")
    pub fn location_label(&self) -> String {
        match (self.locality.is_empty(), self.pincode.is_empty()) {
            (false, false) => format!("{}, {}", self.locality, self.pincode),
            (false, true) => self.locality.clone(),
            (true, false) => self.pincode.clone(),
            (true, true) => self.location.0.to_string(),
        }
    }

    /// The identifying fields returned after registration or update
    pub fn summary(&self) -> RegistrationSummary {
        RegistrationSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            camera_type: self.camera_type,
            coverage_area: self.coverage_area,
            preferences: self.preferences,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummary {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub camera_type: CameraType,
    pub coverage_area: CoverageArea,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferences: Option<SharingPreferences>,
    pub created_at: DateTime<Utc>,
}

/// Validated input for a new registration
#[derive(Debug, Clone, PartialEq)]
pub struct NewRegistration {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub camera_type: CameraType,
    pub coverage_area: CoverageArea,
    pub pincode: String,
    pub locality: String,
    pub location: LatLng,
}

impl NewRegistration {
    pub fn into_registration(self) -> CameraRegistration {
        let now = Utc::now();
        CameraRegistration {
            id: Uuid::new_v4(),
            name: self.name,
            email: self.email,
            phone: self.phone,
            camera_type: self.camera_type,
            coverage_area: self.coverage_area,
            pincode: self.pincode,
            locality: self.locality,
            location: GeoPoint(self.location),
            preferences: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validated partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub camera_type: Option<CameraType>,
    pub coverage_area: Option<CoverageArea>,
    pub preferences: Option<SharingPreferences>,
}

impl RegistrationChanges {
    pub fn is_empty(&self) -> bool {
        *self == RegistrationChanges::default()
    }

    pub fn apply(self, registration: &mut CameraRegistration) {
        if let Some(name) = self.name {
            registration.name = name;
        }
        if let Some(email) = self.email {
            registration.email = Some(email);
        }
        if let Some(phone) = self.phone {
            registration.phone = phone;
        }
        if let Some(camera_type) = self.camera_type {
            registration.camera_type = camera_type;
        }
        if let Some(coverage_area) = self.coverage_area {
            registration.coverage_area = coverage_area;
        }
        if let Some(preferences) = self.preferences {
            registration.preferences = Some(preferences);
        }
        registration.updated_at = Utc::now();
    }
}

/// List filters accepted by `GET /api/users`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrationFilter {
    /// Exact pincode match
    pub pincode: Option<String>,
    /// Case-insensitive substring of the locality
    pub locality: Option<String>,
}

impl RegistrationFilter {
    pub fn matches(&self, registration: &CameraRegistration) -> bool {
        let pincode_ok = match self.pincode.as_deref().filter(|p| !p.is_empty()) {
            Some(pincode) => registration.pincode == pincode,
            None => true,
        };
        let locality_ok = match self.locality.as_deref().filter(|l| !l.is_empty()) {
            Some(locality) => registration
                .locality
                .to_lowercase()
                .contains(&locality.to_lowercase()),
            None => true,
        };
        pincode_ok && locality_ok
    }
}

/// Row layout of `camera_registrations`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CameraRegistrationDb {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub camera_type: String,
    pub coverage_area: String,
    pub pincode: String,
    pub locality: String,
    pub longitude: f64,
    pub latitude: f64,
    pub location: serde_json::Value,
    pub preferences: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CameraRegistrationDb> for CameraRegistration {
    type Error = Error;

    fn try_from(db: CameraRegistrationDb) -> Result<Self, Self::Error> {
        let preferences = db
            .preferences
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::Database(format!("Corrupt preferences for {}: {}", db.id, e)))?;

        Ok(Self {
            id: db.id,
            name: db.name,
            email: db.email,
            phone: db.phone,
            // Legacy rows may carry tags we no longer know; read them as unspecified
            camera_type: db.camera_type.parse().unwrap_or_default(),
            coverage_area: db.coverage_area.parse().unwrap_or_default(),
            pincode: db.pincode,
            locality: db.locality,
            location: GeoPoint(LatLng::new(db.latitude, db.longitude).map_err(|e| {
                Error::Database(format!("Corrupt location for {}: {}", db.id, e))
            })?),
            preferences,
            created_at: db.created_at,
            updated_at: db.updated_at,
        })
    }
}

impl From<CameraRegistration> for CameraRegistrationDb {
    fn from(r: CameraRegistration) -> Self {
        Self {
            id: r.id,
            name: r.name,
            email: r.email,
            phone: r.phone,
            camera_type: r.camera_type.to_string(),
            coverage_area: r.coverage_area.to_string(),
            pincode: r.pincode,
            locality: r.locality,
            longitude: r.location.0.lng,
            latitude: r.location.0.lat,
            location: r.location.to_geojson(),
            preferences: r
                .preferences
                .map(|p| serde_json::to_value(p).unwrap_or(serde_json::Value::Null)),
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
