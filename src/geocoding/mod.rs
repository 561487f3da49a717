//! Forward and reverse geocoding behind a trait, so the registry never talks
//! to a particular provider directly.

use crate::error::Error;
use crate::geo::LatLng;
use anyhow::Result;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub mod nominatim;

pub use nominatim::NominatimGeocoder;

static PINCODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{6}$").expect("valid regex"));

/// Indian postal codes are exactly six digits
pub fn is_valid_pincode(pincode: &str) -> bool {
    PINCODE_RE.is_match(pincode.trim())
}

/// Address details for a coordinate. Missing parts are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReverseGeocode {
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub locality: String,
    pub formatted_address: String,
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Describe the address at a coordinate
    async fn reverse(&self, position: LatLng) -> Result<ReverseGeocode>;

    /// Resolve a free-text address to a coordinate
    async fn search_address(&self, address: &str) -> Result<LatLng>;

    /// Resolve a postal code to a coordinate
    async fn search_pincode(&self, pincode: &str) -> Result<LatLng>;
}

/// Fixed lookup tables. Used for offline development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    addresses: HashMap<String, LatLng>,
    pincodes: HashMap<String, LatLng>,
    reverse: Option<ReverseGeocode>,
}

impl StaticGeocoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: &str, position: LatLng) -> Self {
        self.addresses.insert(address.trim().to_lowercase(), position);
        self
    }

    pub fn with_pincode(mut self, pincode: &str, position: LatLng) -> Self {
        self.pincodes.insert(pincode.trim().to_string(), position);
        self
    }

    /// Answer every reverse lookup with `details`
    pub fn with_reverse(mut self, details: ReverseGeocode) -> Self {
        self.reverse = Some(details);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn reverse(&self, _position: LatLng) -> Result<ReverseGeocode> {
        self.reverse
            .clone()
            .ok_or_else(|| Error::NotFound("Location not found".to_string()).into())
    }

    async fn search_address(&self, address: &str) -> Result<LatLng> {
        self.addresses
            .get(&address.trim().to_lowercase())
            .copied()
            .ok_or_else(|| Error::NotFound("Address not found".to_string()).into())
    }

    async fn search_pincode(&self, pincode: &str) -> Result<LatLng> {
        self.pincodes
            .get(pincode.trim())
            .copied()
            .ok_or_else(|| Error::NotFound("Pincode not found".to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pincode_must_be_six_digits() {
        assert!(is_valid_pincode("302001"));
        assert!(is_valid_pincode(" 302001 "));
        assert!(!is_valid_pincode("30200"));
        assert!(!is_valid_pincode("3020011"));
        assert!(!is_valid_pincode("30200a"));
        assert!(!is_valid_pincode(""));
    }

    #[tokio::test]
    async fn static_geocoder_reports_not_found() {
        let jaipur = LatLng {
            lat: 26.9124,
            lng: 75.7873,
        };
        let geocoder = StaticGeocoder::new()
            .with_address("MI Road", jaipur)
            .with_pincode("302001", jaipur);

        assert_eq!(geocoder.search_address("mi road").await.unwrap(), jaipur);
        assert_eq!(geocoder.search_pincode("302001").await.unwrap(), jaipur);

        let err = geocoder.search_pincode("110001").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
        assert!(geocoder.reverse(jaipur).await.is_err());
    }

    #[test]
    fn reverse_geocode_defaults_missing_fields() {
        let parsed: ReverseGeocode =
            serde_json::from_value(serde_json::json!({"city": "Jaipur"})).unwrap();
        assert_eq!(parsed.city, "Jaipur");
        assert_eq!(parsed.pincode, "");
        assert_eq!(parsed.formatted_address, "");
    }
}
