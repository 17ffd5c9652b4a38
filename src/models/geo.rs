//! Geographic coordinates and bounding boxes.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A rectangular search area with its center point.
///
/// `low` is the south-west corner and `high` the north-east corner, so a
/// well-formed box keeps `low <= center <= high` on both axes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoBounds {
    pub center: GeoPoint,
    pub low: GeoPoint,
    pub high: GeoPoint,
}

impl GeoBounds {
    /// Fallback box covering Singapore, used when geocoding fails.
    pub fn singapore() -> Self {
        Self {
            center: GeoPoint {
                latitude: 1.357107,
                longitude: 103.8194992,
            },
            low: GeoPoint {
                latitude: 1.1285402,
                longitude: 103.5666667,
            },
            high: GeoPoint {
                latitude: 1.5143183,
                longitude: 104.5716696,
            },
        }
    }

    /// Check the corner ordering invariant on both axes.
    pub fn is_ordered(&self) -> bool {
        self.low.latitude <= self.center.latitude
            && self.center.latitude <= self.high.latitude
            && self.low.longitude <= self.center.longitude
            && self.center.longitude <= self.high.longitude
    }
}
