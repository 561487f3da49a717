//! Search/reset session behind the admin map.
//!
//! A session holds the fetched camera list and the subset currently visible.
//! Searches move through `Idle -> Searching -> Results | Error`; only the most
//! recent search may settle, older tickets are cancelled and ignored.

use crate::admin::{AdminCamera, CenterResolver};
use crate::config::MapConfig;
use crate::error::Error;
use crate::geo::{nearest_first, within_radius, Distance, LatLng, Ranked};
use crate::geocoding::is_valid_pincode;
use log::debug;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Default upper bound on resolving a search center
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum SearchMode {
    Address(String),
    Pincode(String),
    /// Around the operator's current position
    Nearby,
}

impl SearchMode {
    fn validate(&self) -> Result<(), Error> {
        match self {
            SearchMode::Address(address) if address.trim().is_empty() => {
                Err(Error::Validation("Please enter an address".to_string()))
            }
            SearchMode::Pincode(pincode) if !is_valid_pincode(pincode) => Err(Error::Validation(
                "Please enter a valid 6-digit pincode".to_string(),
            )),
            _ => Ok(()),
        }
    }

    fn zoom(&self, map: &MapConfig) -> u8 {
        match self {
            SearchMode::Nearby => map.nearby_zoom,
            _ => map.search_zoom,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    Searching(SearchMode),
    Results {
        mode: SearchMode,
        center: LatLng,
        radius: Distance,
    },
    /// User-facing failure message
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapStats {
    pub total: usize,
    pub filtered: usize,
    /// Share of cameras visible, in percent to one decimal
    pub coverage: f64,
}

/// Handle for one search attempt
#[derive(Debug, Clone)]
pub struct SearchTicket {
    generation: u64,
    mode: SearchMode,
    token: CancellationToken,
}

impl SearchTicket {
    pub fn mode(&self) -> &SearchMode {
        &self.mode
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Resolve the center for a ticket, giving up on timeout or cancellation
pub async fn resolve_center(
    resolver: &CenterResolver,
    ticket: &SearchTicket,
    timeout: Duration,
) -> Result<LatLng, Error> {
    tokio::select! {
        _ = ticket.token.cancelled() => {
            Err(Error::Cancelled(format!("search {}", ticket.generation)))
        }
        resolved = tokio::time::timeout(timeout, resolver.resolve(&ticket.mode)) => match resolved {
            Ok(Ok(center)) => Ok(center),
            Ok(Err(e)) => Err(Error::from_anyhow(e)),
            Err(_) => Err(Error::Network("Search timed out".to_string())),
        },
    }
}

pub struct AdminMap {
    config: MapConfig,
    cameras: Vec<AdminCamera>,
    visible: Vec<AdminCamera>,
    state: SearchState,
    /// State to return to if the in-flight search is cancelled
    settled: SearchState,
    filter: Option<(LatLng, Distance)>,
    radius: Distance,
    view: MapView,
    generation: u64,
    in_flight: Option<CancellationToken>,
    highlighted: Option<Uuid>,
    timeout: Duration,
}

impl AdminMap {
    pub fn new(config: MapConfig) -> Self {
        let view = Self::default_view(&config);
        let radius = Distance::km(config.default_radius_km);
        Self {
            config,
            cameras: Vec::new(),
            visible: Vec::new(),
            state: SearchState::Idle,
            settled: SearchState::Idle,
            filter: None,
            radius,
            view,
            generation: 0,
            in_flight: None,
            highlighted: None,
            timeout: SEARCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn default_view(config: &MapConfig) -> MapView {
        let [lat, lng] = config.default_center;
        MapView {
            center: LatLng { lat, lng },
            zoom: config.default_zoom,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn radius(&self) -> Distance {
        self.radius
    }

    pub fn cameras(&self) -> &[AdminCamera] {
        &self.cameras
    }

    pub fn visible(&self) -> &[AdminCamera] {
        &self.visible
    }

    /// Visible cameras with their distance from the search center, nearest
    /// first. Empty when no search is applied.
    pub fn visible_ranked(&self) -> Vec<Ranked<AdminCamera>> {
        match self.filter {
            Some((center, radius)) => nearest_first(&self.cameras, center, radius),
            None => Vec::new(),
        }
    }

    /// Replace the fetched list wholesale and re-apply the active filter
    pub fn replace_cameras(&mut self, cameras: Vec<AdminCamera>) {
        self.cameras = cameras;
        if let Some(id) = self.highlighted {
            if !self.cameras.iter().any(|c| c.id == id) {
                self.highlighted = None;
            }
        }
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        self.visible = match self.filter {
            Some((center, radius)) => within_radius(&self.cameras, center, radius),
            None => self.cameras.clone(),
        };
    }

    fn cancel_in_flight(&mut self) {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }

    /// Start a search, superseding any search still in flight
    pub fn begin_search(&mut self, mode: SearchMode) -> Result<SearchTicket, Error> {
        mode.validate()?;

        self.cancel_in_flight();
        self.generation += 1;

        let token = CancellationToken::new();
        self.in_flight = Some(token.clone());
        if !matches!(self.state, SearchState::Searching(_)) {
            self.settled = self.state.clone();
        }
        self.state = SearchState::Searching(mode.clone());

        debug!("Search {} started: {:?}", self.generation, mode);

        Ok(SearchTicket {
            generation: self.generation,
            mode,
            token,
        })
    }

    fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.generation == self.generation && !ticket.token.is_cancelled()
    }

    /// Settle a search at `center`. Returns false for a superseded ticket.
    pub fn complete_search(&mut self, ticket: &SearchTicket, center: LatLng) -> bool {
        if !self.is_current(ticket) {
            debug!("Ignoring stale search {}", ticket.generation);
            return false;
        }

        self.in_flight = None;
        self.filter = Some((center, self.radius));
        self.view = MapView {
            center,
            zoom: ticket.mode.zoom(&self.config),
        };
        self.state = SearchState::Results {
            mode: ticket.mode.clone(),
            center,
            radius: self.radius,
        };
        self.apply_filter();
        true
    }

    /// Record a failed search. The camera list is left as it was.
    pub fn fail_search(&mut self, ticket: &SearchTicket, error: &Error) -> bool {
        if !self.is_current(ticket) {
            debug!("Ignoring failure of stale search {}", ticket.generation);
            return false;
        }

        self.in_flight = None;
        self.state = SearchState::Error(error.user_message());
        true
    }

    /// Abandon the in-flight search and go back to the last settled state
    pub fn cancel_search(&mut self) {
        if self.in_flight.is_none() {
            return;
        }
        self.cancel_in_flight();
        self.generation += 1;
        self.state = std::mem::replace(&mut self.settled, SearchState::Idle);
    }

    /// Run one search end to end
    pub async fn search(
        &mut self,
        resolver: &CenterResolver,
        mode: SearchMode,
    ) -> Result<&SearchState, Error> {
        let ticket = self.begin_search(mode)?;
        match resolve_center(resolver, &ticket, self.timeout).await {
            Ok(center) => self.complete_search(&ticket, center),
            Err(e) => self.fail_search(&ticket, &e),
        };
        Ok(&self.state)
    }

    /// Change the radius, re-filtering when results are shown
    pub fn set_radius(&mut self, radius: Distance) {
        self.radius = radius;
        if let SearchState::Results { radius: shown, .. } = &mut self.state {
            *shown = radius;
        }
        if let Some((center, _)) = self.filter {
            self.filter = Some((center, radius));
            self.apply_filter();
        }
    }

    /// Back to the full list and the default view
    pub fn reset(&mut self) {
        self.cancel_in_flight();
        self.generation += 1;
        self.state = SearchState::Idle;
        self.settled = SearchState::Idle;
        self.filter = None;
        self.view = Self::default_view(&self.config);
        self.highlighted = None;
        self.apply_filter();
    }

    pub fn highlight(&mut self, id: Uuid) -> Result<&AdminCamera, Error> {
        let camera = self
            .visible
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::NotFound("Camera not found".to_string()))?;
        self.highlighted = Some(id);
        Ok(camera)
    }

    pub fn highlighted(&self) -> Option<&AdminCamera> {
        self.highlighted
            .and_then(|id| self.cameras.iter().find(|c| c.id == id))
    }

    pub fn stats(&self) -> MapStats {
        let total = self.cameras.len();
        let filtered = self.visible.len();
        let coverage = if total == 0 {
            0.0
        } else {
            (filtered as f64 / total as f64 * 1000.0).round() / 10.0
        };
        MapStats {
            total,
            filtered,
            coverage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::{FixedPosition, PositionSource};
    use crate::db::models::{CameraType, CoverageArea};
    use crate::geocoding::StaticGeocoder;
    use async_trait::async_trait;
    use std::sync::Arc;

    const JAIPUR: LatLng = LatLng {
        lat: 26.9124,
        lng: 75.7873,
    };

    fn camera(name: &str, lat: f64, lng: f64) -> AdminCamera {
        AdminCamera {
            id: Uuid::new_v4(),
            name: name.to_string(),
            lat,
            lng,
            location: String::new(),
            camera_type: CameraType::Dome,
            coverage_area: CoverageArea::Unspecified,
            distance_m: None,
        }
    }

    fn session() -> AdminMap {
        let mut map = AdminMap::new(MapConfig::default());
        map.replace_cameras(vec![
            camera("near", 26.9230, 75.7960),
            camera("far", 26.8310, 75.7900),
            camera("center", 26.9124, 75.7873),
        ]);
        map
    }

    fn resolver() -> CenterResolver {
        let geocoder = StaticGeocoder::new()
            .with_address("MI Road", JAIPUR)
            .with_pincode("302001", JAIPUR);
        CenterResolver::new(Arc::new(geocoder), Arc::new(FixedPosition(Some(JAIPUR))))
    }

    struct SlowPosition;

    #[async_trait]
    impl PositionSource for SlowPosition {
        async fn current_position(&self) -> anyhow::Result<LatLng> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(JAIPUR)
        }
    }

    fn names(cameras: &[AdminCamera]) -> Vec<&str> {
        cameras.iter().map(|c| c.name.as_str()).collect()
    }

    #[tokio::test]
    async fn address_search_filters_and_zooms() {
        let mut map = session();
        map.search(&resolver(), SearchMode::Address("mi road".to_string()))
            .await
            .unwrap();

        assert!(matches!(map.state(), SearchState::Results { center, .. } if *center == JAIPUR));
        assert_eq!(names(map.visible()), vec!["near", "center"]);
        assert_eq!(map.view(), MapView { center: JAIPUR, zoom: 13 });

        let stats = map.stats();
        assert_eq!((stats.total, stats.filtered), (3, 2));
        assert_eq!(stats.coverage, 66.7);
    }

    #[tokio::test]
    async fn nearby_search_uses_closer_zoom() {
        let mut map = session();
        map.search(&resolver(), SearchMode::Nearby).await.unwrap();
        assert_eq!(map.view().zoom, 14);

        let ranked = map.visible_ranked();
        assert_eq!(ranked[0].item.name, "center");
        assert_eq!(ranked[1].item.name, "near");
    }

    #[tokio::test]
    async fn reset_restores_full_list_and_default_view() {
        let mut map = session();
        let default_view = map.view();
        map.search(&resolver(), SearchMode::Pincode("302001".to_string()))
            .await
            .unwrap();
        let near_id = map.visible()[0].id;
        map.highlight(near_id).unwrap();

        map.reset();
        assert_eq!(map.state(), &SearchState::Idle);
        assert_eq!(map.visible().len(), 3);
        assert_eq!(map.view(), default_view);
        assert!(map.highlighted().is_none());
        assert!(map.visible_ranked().is_empty());
    }

    #[tokio::test]
    async fn failed_search_keeps_the_list() {
        let mut map = session();
        map.search(&resolver(), SearchMode::Address("mi road".to_string()))
            .await
            .unwrap();

        let state = map
            .search(&resolver(), SearchMode::Address("nowhere".to_string()))
            .await
            .unwrap()
            .clone();
        assert!(matches!(state, SearchState::Error(_)));
        assert_eq!(map.visible().len(), 2);
    }

    #[tokio::test]
    async fn denied_position_reports_permission_message() {
        let mut map = session();
        let resolver = CenterResolver::new(
            Arc::new(StaticGeocoder::new()),
            Arc::new(FixedPosition(None)),
        );
        let state = map.search(&resolver, SearchMode::Nearby).await.unwrap();
        assert_eq!(
            state,
            &SearchState::Error("Unable to get your location. Please enable location access.".to_string())
        );
    }

    #[test]
    fn invalid_queries_never_start() {
        let mut map = session();
        assert!(map.begin_search(SearchMode::Address("  ".to_string())).is_err());
        assert!(map.begin_search(SearchMode::Pincode("3020".to_string())).is_err());
        assert_eq!(map.state(), &SearchState::Idle);
    }

    #[test]
    fn stale_tickets_are_ignored() {
        let mut map = session();
        let first = map.begin_search(SearchMode::Nearby).unwrap();
        let second = map
            .begin_search(SearchMode::Address("MI Road".to_string()))
            .unwrap();
        assert!(first.is_cancelled());

        let elsewhere = LatLng { lat: 0.0, lng: 0.0 };
        assert!(!map.complete_search(&first, elsewhere));
        assert!(!map.fail_search(&first, &Error::Network("late".to_string())));
        assert!(matches!(map.state(), SearchState::Searching(SearchMode::Address(_))));

        assert!(map.complete_search(&second, JAIPUR));
        assert_eq!(map.visible().len(), 2);
    }

    #[tokio::test]
    async fn superseded_resolution_reports_cancelled() {
        let mut map = session();
        let resolver = CenterResolver::new(Arc::new(StaticGeocoder::new()), Arc::new(SlowPosition));
        let first = map.begin_search(SearchMode::Nearby).unwrap();

        let pending = {
            let resolver = resolver.clone();
            let ticket = first.clone();
            tokio::spawn(async move { resolve_center(&resolver, &ticket, SEARCH_TIMEOUT).await })
        };
        map.begin_search(SearchMode::Nearby).unwrap();

        let outcome = pending.await.unwrap();
        assert!(matches!(outcome, Err(Error::Cancelled(_))));
    }

    #[tokio::test]
    async fn slow_resolution_times_out() {
        let mut map = session().with_timeout(Duration::from_millis(20));
        let resolver = CenterResolver::new(Arc::new(StaticGeocoder::new()), Arc::new(SlowPosition));
        let state = map.search(&resolver, SearchMode::Nearby).await.unwrap();
        assert_eq!(
            state,
            &SearchState::Error("Network request failed. Please try again.".to_string())
        );
        assert_eq!(map.visible().len(), 3);
    }

    #[test]
    fn cancel_returns_to_previous_state() {
        let mut map = session();
        let ticket = map.begin_search(SearchMode::Nearby).unwrap();
        map.cancel_search();
        assert_eq!(map.state(), &SearchState::Idle);
        assert!(!map.complete_search(&ticket, JAIPUR));
        assert_eq!(map.visible().len(), 3);
    }

    #[test]
    fn radius_changes_refilter_results() {
        let mut map = session();
        let ticket = map.begin_search(SearchMode::Nearby).unwrap();
        map.complete_search(&ticket, JAIPUR);
        assert_eq!(map.visible().len(), 2);

        map.set_radius(Distance::km(10.0));
        assert_eq!(map.visible().len(), 3);
        assert!(matches!(map.state(), SearchState::Results { radius, .. } if radius.as_km() == 10.0));

        map.set_radius(Distance::ZERO);
        assert_eq!(names(map.visible()), vec!["center"]);
    }

    #[test]
    fn replacing_cameras_keeps_the_filter() {
        let mut map = session();
        let ticket = map.begin_search(SearchMode::Nearby).unwrap();
        map.complete_search(&ticket, JAIPUR);

        map.replace_cameras(vec![camera("far", 26.8310, 75.7900)]);
        assert!(map.visible().is_empty());
        assert_eq!(map.stats().coverage, 0.0);

        map.replace_cameras(Vec::new());
        assert_eq!(map.stats(), MapStats { total: 0, filtered: 0, coverage: 0.0 });
    }
}
