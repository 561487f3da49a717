pub mod registration_models;

pub use registration_models::{
    CameraRegistration, CameraRegistrationDb, CameraType, CoverageArea, GeoPoint,
    NewRegistration, RegistrationChanges, RegistrationFilter, RegistrationSummary,
    SharingPreferences,
};
