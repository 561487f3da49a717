use crate::config::GeocodingConfig;
use crate::error::Error;
use crate::geo::LatLng;
use crate::geocoding::{Geocoder, ReverseGeocode};
use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// OpenStreetMap Nominatim client
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: Url,
    region_hint: String,
    country: String,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimAddress {
    postcode: Option<String>,
    city: Option<String>,
    town: Option<String>,
    state: Option<String>,
    suburb: Option<String>,
    village: Option<String>,
    neighbourhood: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimReverse {
    error: Option<String>,
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

fn network_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Network("Geocoding request timed out".to_string())
    } else {
        Error::Network(format!("Geocoding request failed: {}", e))
    }
}

/// First non-empty candidate, or ""
fn first_of(candidates: &[&Option<String>]) -> String {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .find(|c| !c.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn flatten_reverse(response: NominatimReverse) -> Result<ReverseGeocode, Error> {
    if response.error.is_some() {
        return Err(Error::NotFound("Location not found".to_string()));
    }
    let address = response.address.unwrap_or_default();

    Ok(ReverseGeocode {
        pincode: first_of(&[&address.postcode]),
        city: first_of(&[&address.city, &address.town]),
        state: first_of(&[&address.state]),
        locality: first_of(&[&address.suburb, &address.village, &address.neighbourhood]),
        formatted_address: response.display_name.unwrap_or_default(),
    })
}

fn first_place(places: Vec<NominatimPlace>, what: &str) -> Result<LatLng, Error> {
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| Error::NotFound(format!("{} not found", what)))?;

    let lat = place
        .lat
        .parse::<f64>()
        .map_err(|_| Error::Network(format!("Malformed latitude: {}", place.lat)))?;
    let lng = place
        .lon
        .parse::<f64>()
        .map_err(|_| Error::Network(format!("Malformed longitude: {}", place.lon)))?;

    LatLng::new(lat, lng).map_err(|e| Error::Network(e.to_string()))
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("Failed to build geocoding client: {}", e)))?;

        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid geocoding base URL: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            region_hint: config.region_hint.clone(),
            country: config.country.clone(),
        })
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map(|mut segments| {
                segments.pop_if_empty().push(path);
            })
            .ok();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .extend_pairs(params);
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("Geocoding request: {}", url);

        let response = self.client.get(url).send().await.map_err(network_error)?;
        if !response.status().is_success() {
            warn!("Geocoding provider returned {}", response.status());
            return Err(Error::Network(format!(
                "Geocoding provider returned {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Network(format!("Malformed geocoding response: {}", e)))
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, position: LatLng) -> Result<ReverseGeocode> {
        let lat = position.lat.to_string();
        let lon = position.lng.to_string();
        let url = self.endpoint(
            "reverse",
            &[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("addressdetails", "1"),
            ],
        );

        let response: NominatimReverse = self.get_json(url).await?;
        Ok(flatten_reverse(response)?)
    }

    async fn search_address(&self, address: &str) -> Result<LatLng> {
        let query = format!("{}{}", address.trim(), self.region_hint);
        let url = self.endpoint("search", &[("q", query.as_str())]);

        let places: Vec<NominatimPlace> = self.get_json(url).await?;
        Ok(first_place(places, "Address")?)
    }

    async fn search_pincode(&self, pincode: &str) -> Result<LatLng> {
        let url = self.endpoint(
            "search",
            &[("postalcode", pincode.trim()), ("country", self.country.as_str())],
        );

        let places: Vec<NominatimPlace> = self.get_json(url).await?;
        Ok(first_place(places, "Pincode")?)
    }
}
