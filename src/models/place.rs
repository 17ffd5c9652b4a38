//! Point-of-interest records from place search.

use serde::{Deserialize, Serialize};

/// A place returned by text search, enriched with reviews and a photo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    /// Provider place id
    pub id: Option<String>,

    /// Display name ("N/A" when the provider omits one)
    pub name: String,

    /// Formatted address ("N/A" when the provider omits one)
    pub address: String,

    /// Average rating
    pub rating: Option<f64>,

    /// Number of ratings behind the average
    pub rating_count: Option<u32>,

    /// Price level label
    pub price_level: Option<String>,

    /// First photo, Base64-encoded; unset when the place has no photos or
    /// the media fetch failed
    pub photo_base64: Option<String>,

    /// Maps search link composed from the address and place id
    pub google_maps_link: String,

    /// Up to three reviews with non-empty text
    pub reviews: Vec<Review>,
}

/// A single review attached to a place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    /// Reviewer display name ("Anonymous" when the provider omits one)
    pub reviewer_name: String,

    /// Review text, never empty
    pub text: String,

    /// Star rating given by the reviewer
    pub rating: Option<f64>,
}
