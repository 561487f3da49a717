use crate::admin::search::SearchMode;
use crate::error::Error;
use crate::geo::LatLng;
use crate::geocoding::Geocoder;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Source of the operator's current position
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> Result<LatLng>;
}

/// A position known up front, or none at all (permission denied)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPosition(pub Option<LatLng>);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<LatLng> {
        self.0.ok_or_else(|| {
            Error::Permission("Current position is not available".to_string()).into()
        })
    }
}

/// Turns a search mode into a map center
#[derive(Clone)]
pub struct CenterResolver {
    geocoder: Arc<dyn Geocoder>,
    position: Arc<dyn PositionSource>,
}

impl CenterResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, position: Arc<dyn PositionSource>) -> Self {
        Self { geocoder, position }
    }

    pub async fn resolve(&self, mode: &SearchMode) -> Result<LatLng> {
        match mode {
            SearchMode::Address(address) => self.geocoder.search_address(address).await,
            SearchMode::Pincode(pincode) => self.geocoder.search_pincode(pincode).await,
            SearchMode::Nearby => self.position.current_position().await,
        }
    }
}
