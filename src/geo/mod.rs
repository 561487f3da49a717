//! Great-circle distance and radius filtering.
//!
//! Everything here is pure: the same inputs always yield the same output, and
//! the filters keep the input order of whatever they return.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
/// Two points closer than this are treated as coincident
pub const COINCIDENT_TOLERANCE_KM: f64 = 1e-9;

/// A WGS84 position. Latitude first, as the map widgets expect it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Build a position, rejecting non-finite or out-of-range values
    pub fn new(lat: f64, lng: f64) -> Result<Self, Error> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(Error::Validation("Invalid coordinates".to_string()));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::Validation(format!(
                "Coordinates out of range (lat {}, lng {})",
                lat, lng
            )));
        }
        Ok(Self { lat, lng })
    }
}

impl fmt::Display for LatLng {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.lat, self.lng)
    }
}

/// Anything that sits at a point on the map
pub trait Located {
    fn position(&self) -> LatLng;
}

impl Located for LatLng {
    fn position(&self) -> LatLng {
        *self
    }
}

/// A non-negative distance. Stored in meters; constructors make the unit
/// explicit so radius and distance never get compared across units.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Distance {
    meters: f64,
}

impl Distance {
    pub const ZERO: Distance = Distance { meters: 0.0 };

    pub fn meters(meters: f64) -> Self {
        Self {
            meters: meters.max(0.0),
        }
    }

    pub fn km(km: f64) -> Self {
        Self::meters(km * 1000.0)
    }

    pub fn as_meters(&self) -> f64 {
        self.meters
    }

    pub fn as_km(&self) -> f64 {
        self.meters / 1000.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.meters < 1000.0 {
            write!(f, "{:.0} m", self.meters)
        } else {
            write!(f, "{:.2} km", self.as_km())
        }
    }
}

fn haversine(a: LatLng, b: LatLng, radius: f64) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);

    // Rounding can push h a hair past 1 for antipodal points
    2.0 * radius * h.sqrt().min(1.0).asin()
}

/// Great-circle distance in kilometers
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    haversine(a, b, EARTH_RADIUS_KM)
}

/// Great-circle distance in meters
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    haversine(a, b, EARTH_RADIUS_M)
}

/// Great-circle distance as a [`Distance`]
pub fn distance(a: LatLng, b: LatLng) -> Distance {
    Distance::km(haversine_km(a, b))
}

/// Inclusive radius test. The coincidence tolerance only applies to a zero
/// radius, so nothing farther than a positive radius is ever admitted.
fn in_range(km: f64, radius: Distance) -> bool {
    if radius == Distance::ZERO {
        km <= COINCIDENT_TOLERANCE_KM
    } else {
        km <= radius.as_km()
    }
}

/// True when `point` lies within `radius` of `center` (inclusive)
pub fn is_within(center: LatLng, point: LatLng, radius: Distance) -> bool {
    in_range(haversine_km(center, point), radius)
}

/// The subset of `items` within `radius` of `center`, in input order
pub fn within_radius<T>(items: &[T], center: LatLng, radius: Distance) -> Vec<T>
where
    T: Located + Clone,
{
    items
        .iter()
        .filter(|item| is_within(center, item.position(), radius))
        .cloned()
        .collect()
}

/// Split `items` into (inside, outside) the radius in one scan
pub fn partition_by_radius<T>(items: &[T], center: LatLng, radius: Distance) -> (Vec<T>, Vec<T>)
where
    T: Located + Clone,
{
    items
        .iter()
        .cloned()
        .partition(|item| is_within(center, item.position(), radius))
}

/// An item paired with its distance from a search center
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<T> {
    pub item: T,
    pub distance: Distance,
}

/// Items within `radius`, nearest first. Ties keep input order.
pub fn nearest_first<T>(items: &[T], center: LatLng, radius: Distance) -> Vec<Ranked<T>>
where
    T: Located + Clone,
{
    let mut ranked: Vec<Ranked<T>> = items
        .iter()
        .filter_map(|item| {
            let km = haversine_km(center, item.position());
            in_range(km, radius).then(|| Ranked {
                item: item.clone(),
                distance: Distance::km(km),
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng { lat, lng }
    }

    const JAIPUR: LatLng = LatLng {
        lat: 26.9124,
        lng: 75.7873,
    };

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (JAIPUR, p(26.9230, 75.7960)),
            (p(0.0, 0.0), p(-45.0, 170.0)),
            (p(89.9, -179.9), p(-89.9, 179.9)),
            (p(51.5074, -0.1278), p(40.7128, -74.0060)),
        ];
        for (a, b) in pairs {
            assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
        }
    }

    #[test]
    fn distance_to_self_is_zero() {
        for point in [JAIPUR, p(0.0, 0.0), p(-90.0, 180.0), p(45.0, -120.5)] {
            assert!(haversine_km(point, point).abs() < 1e-9);
        }
    }

    #[test]
    fn meters_and_km_agree() {
        let b = p(26.8310, 75.7900);
        assert!((haversine_m(JAIPUR, b) - haversine_km(JAIPUR, b) * 1000.0).abs() < 1e-6);
    }

    #[test]
    fn jaipur_five_km_example() {
        let near = p(26.9230, 75.7960);
        let far = p(26.8310, 75.7900);

        let near_km = haversine_km(JAIPUR, near);
        let far_km = haversine_km(JAIPUR, far);
        assert!(near_km > 1.3 && near_km < 1.7, "near was {near_km}");
        assert!(far_km > 8.9 && far_km < 9.3, "far was {far_km}");

        let kept = within_radius(&[near, far], JAIPUR, Distance::km(5.0));
        assert_eq!(kept, vec![near]);
    }

    #[test]
    fn filter_is_a_subset_split_at_the_radius() {
        let points: Vec<LatLng> = (0..40)
            .map(|i| p(26.80 + i as f64 * 0.007, 75.70 + (i % 7) as f64 * 0.03))
            .collect();
        let radius = Distance::km(6.0);

        let (inside, outside) = partition_by_radius(&points, JAIPUR, radius);
        assert_eq!(inside.len() + outside.len(), points.len());
        assert_eq!(inside, within_radius(&points, JAIPUR, radius));

        for point in &inside {
            assert!(points.contains(point));
            assert!(haversine_km(JAIPUR, *point) <= radius.as_km());
        }
        for point in &outside {
            assert!(haversine_km(JAIPUR, *point) > radius.as_km());
        }
    }

    #[test]
    fn zero_radius_keeps_only_coincident_points() {
        let points = [JAIPUR, p(26.9124, 75.78731), JAIPUR];
        let kept = within_radius(&points, JAIPUR, Distance::ZERO);
        assert_eq!(kept, vec![JAIPUR, JAIPUR]);
    }

    #[test]
    fn points_just_past_the_radius_are_excluded() {
        let center = p(0.0, 0.0);
        let point = p(0.0, 0.001);
        let km = haversine_km(center, point);

        let just_short = Distance::km(km - 5e-10);
        assert!(just_short.as_km() < km);
        assert!(!is_within(center, point, just_short));
        assert!(within_radius(&[point], center, just_short).is_empty());
        assert!(nearest_first(&[point], center, just_short).is_empty());

        let generous = Distance::km(km + 1e-6);
        assert!(is_within(center, point, generous));
        for ranked in nearest_first(&[point], center, generous) {
            assert!(ranked.distance.as_km() <= generous.as_km());
        }
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let none: Vec<LatLng> = Vec::new();
        assert!(within_radius(&none, JAIPUR, Distance::km(100.0)).is_empty());
        assert!(nearest_first(&none, JAIPUR, Distance::km(100.0)).is_empty());
    }

    #[test]
    fn nearest_first_sorts_by_distance() {
        let points = [p(26.9300, 75.7873), p(26.9130, 75.7873), p(26.9200, 75.7873)];
        let ranked = nearest_first(&points, JAIPUR, Distance::km(10.0));
        let order: Vec<LatLng> = ranked.iter().map(|r| r.item).collect();
        assert_eq!(order, vec![points[1], points[2], points[0]]);
        assert!(ranked[0].distance < ranked[1].distance);
    }

    #[test]
    fn negative_distance_clamps_to_zero() {
        assert_eq!(Distance::meters(-5.0), Distance::ZERO);
        assert_eq!(Distance::km(1.5).as_meters(), 1500.0);
        assert_eq!(Distance::meters(500.0).to_string(), "500 m");
        assert_eq!(Distance::km(2.0).to_string(), "2.00 km");
    }

    #[test]
    fn lat_lng_rejects_out_of_range() {
        assert!(LatLng::new(26.9, 75.8).is_ok());
        assert!(matches!(LatLng::new(91.0, 0.0), Err(Error::Validation(_))));
        assert!(matches!(LatLng::new(0.0, -180.5), Err(Error::Validation(_))));
        assert!(matches!(LatLng::new(f64::NAN, 0.0), Err(Error::Validation(_))));
    }
}
