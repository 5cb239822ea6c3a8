//! Coordinates, polygon centroids, and resolved addresses.

use serde::{Deserialize, Serialize};

use crate::model::{FullAddress, Street, ValidationError};

/// Validated lat/lng. Rejects NaN, infinity, and out-of-range values at
/// construction so the rest of the crate never has to re-check.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Result<Self, ValidationError> {
        if !lat.is_finite()
            || !lng.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(ValidationError::InvalidCoordinate { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    #[must_use]
    pub const fn lat(self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(self) -> f64 {
        self.lng
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.lat.to_bits() == other.lat.to_bits() && self.lng.to_bits() == other.lng.to_bits()
    }
}

impl Eq for Coordinate {}

impl std::hash::Hash for Coordinate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lat.to_bits().hash(state);
        self.lng.to_bits().hash(state);
    }
}

/// Centroid of a set of coordinates by spherical averaging: each point
/// is mapped onto the unit sphere, the Cartesian components are
/// averaged, and the mean vector is mapped back to lat/lng. Returns
/// `None` for an empty input or when the mean degenerates to a point
/// the validator rejects.
#[must_use]
pub fn polygon_centroid(points: &[Coordinate]) -> Option<Coordinate> {
    if points.is_empty() {
        return None;
    }

    let mut x = 0.0_f64;
    let mut y = 0.0_f64;
    let mut z = 0.0_f64;

    for point in points {
        let lat = point.lat.to_radians();
        let lng = point.lng.to_radians();
        x += lat.cos() * lng.cos();
        y += lat.cos() * lng.sin();
        z += lat.sin();
    }

    #[allow(clippy::cast_precision_loss)]
    let n = points.len() as f64;
    x /= n;
    y /= n;
    z /= n;

    let lng = y.atan2(x);
    let hyp = (x * x + y * y).sqrt();
    let lat = z.atan2(hyp);

    Coordinate::new(lat.to_degrees(), lng.to_degrees()).ok()
}

/// A reverse-geocoded address: a delivery can come back with a short
/// street line, a full formatted address, or both.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Street(Street),
    Full(FullAddress),
    Both { street: Street, full: FullAddress },
}

impl Address {
    #[must_use]
    pub fn from_parts(street: Option<Street>, full: Option<FullAddress>) -> Option<Self> {
        match (street, full) {
            (Some(street), Some(full)) => Some(Self::Both { street, full }),
            (Some(street), None) => Some(Self::Street(street)),
            (None, Some(full)) => Some(Self::Full(full)),
            (None, None) => None,
        }
    }

    #[must_use]
    pub fn street(&self) -> Option<&Street> {
        match self {
            Self::Street(street) | Self::Both { street, .. } => Some(street),
            Self::Full(_) => None,
        }
    }

    #[must_use]
    pub fn full(&self) -> Option<&FullAddress> {
        match self {
            Self::Full(full) | Self::Both { full, .. } => Some(full),
            Self::Street(_) => None,
        }
    }

    /// The single line shown in titles: street when present, otherwise
    /// the full address.
    #[must_use]
    pub fn display_line(&self) -> &str {
        match self {
            Self::Street(street) | Self::Both { street, .. } => street.as_str(),
            Self::Full(full) => full.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn coordinate_rejects_non_finite() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn coordinate_rejects_out_of_range() {
        assert!(Coordinate::new(90.1, 0.0).is_err());
        assert!(Coordinate::new(0.0, -180.5).is_err());
        assert!(Coordinate::new(90.0, 180.0).is_ok());
    }

    #[test]
    fn centroid_of_empty_is_none() {
        assert!(polygon_centroid(&[]).is_none());
    }

    #[test]
    fn centroid_of_single_point_is_that_point() {
        let c = polygon_centroid(&[coord(37.775, -122.419)]).unwrap();
        assert!((c.lat() - 37.775).abs() < 1e-6);
        assert!((c.lng() - (-122.419)).abs() < 1e-6);
    }

    #[test]
    fn centroid_lies_within_small_convex_region() {
        let triangle = [
            coord(37.770, -122.420),
            coord(37.780, -122.420),
            coord(37.770, -122.410),
        ];
        let c = polygon_centroid(&triangle).unwrap();
        assert!(c.lat() > 37.770 && c.lat() < 37.780);
        assert!(c.lng() > -122.420 && c.lng() < -122.410);
    }

    #[test]
    fn address_prefers_street_for_display() {
        let street = Street::new("Main St 5").unwrap();
        let full = FullAddress::new("Main St 5, Springfield").unwrap();
        let address = Address::from_parts(Some(street), Some(full)).unwrap();
        assert_eq!(address.display_line(), "Main St 5");
    }
}

#[cfg(test)]
mod centroid_props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // The centroid of a small convex cluster stays inside its
        // bounding box. Spherical averaging can leave the box for
        // antipodal inputs, which geofences never are.
        #[test]
        fn centroid_stays_in_bounding_box(
            base_lat in -60.0_f64..60.0,
            base_lng in -170.0_f64..170.0,
            offsets in proptest::collection::vec((0.0_f64..0.05, 0.0_f64..0.05), 3..8),
        ) {
            let points: Vec<Coordinate> = offsets
                .iter()
                .map(|(dlat, dlng)| Coordinate::new(base_lat + dlat, base_lng + dlng).unwrap())
                .collect();
            let c = polygon_centroid(&points).unwrap();

            let min_lat = points.iter().map(Coordinate::lat).fold(f64::MAX, f64::min);
            let max_lat = points.iter().map(Coordinate::lat).fold(f64::MIN, f64::max);
            let min_lng = points.iter().map(Coordinate::lng).fold(f64::MAX, f64::min);
            let max_lng = points.iter().map(Coordinate::lng).fold(f64::MIN, f64::max);

            prop_assert!(c.lat() >= min_lat - 1e-6 && c.lat() <= max_lat + 1e-6);
            prop_assert!(c.lng() >= min_lng - 1e-6 && c.lng() <= max_lng + 1e-6);
        }
    }
}
