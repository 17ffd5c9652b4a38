// src/services/geocode.rs

//! Forward geocoding via the Nominatim search API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{Config, GeoBounds, GeoPoint};

/// Courtesy gap between requests per the service's usage policy.
const MIN_REQUEST_GAP: Duration = Duration::from_secs(1);
const GEOCODE_TIMEOUT_SECS: u64 = 10;

/// Resolves a free-text location to a center point and bounding box.
pub struct Geocoder {
    config: Arc<Config>,
    client: Client,
    last_request: Mutex<Option<Instant>>,
}

impl Geocoder {
    pub fn new(config: Arc<Config>, client: Client) -> Self {
        Self {
            config,
            client,
            last_request: Mutex::new(None),
        }
    }

    /// Resolve `query` to bounds, restricted to the given country codes.
    ///
    /// Returns `None` when the service fails or the result carries no
    /// bounding box; the caller decides the fallback.
    pub async fn resolve(&self, query: &str, country_codes: &[String]) -> Option<GeoBounds> {
        match self.fetch_bounds(query, country_codes).await {
            Ok(Some(bounds)) => Some(bounds),
            Ok(None) => {
                log::warn!("Could not find a bounding box for '{query}'.");
                None
            }
            Err(error) => {
                log::error!("Error retrieving location details for '{query}': {error}");
                None
            }
        }
    }

    async fn fetch_bounds(
        &self,
        query: &str,
        country_codes: &[String],
    ) -> Result<Option<GeoBounds>> {
        self.pace().await;

        let codes = country_codes.join(",").to_lowercase();
        let results: Vec<NominatimResult> = self
            .client
            .get(&self.config.endpoints.nominatim)
            .query(&[
                ("q", query),
                ("format", "jsonv2"),
                ("limit", "1"),
                ("addressdetails", "1"),
                ("countrycodes", codes.as_str()),
            ])
            .timeout(Duration::from_secs(GEOCODE_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(first) = results.into_iter().next() else {
            return Ok(None);
        };
        bounds_from_result(first)
    }

    /// Keep at least [`MIN_REQUEST_GAP`] between consecutive requests.
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < MIN_REQUEST_GAP {
                tokio::time::sleep(MIN_REQUEST_GAP - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Build bounds from one geocoding result. The bounding box arrives as four
/// strings ordered south, north, west, east.
fn bounds_from_result(result: NominatimResult) -> Result<Option<GeoBounds>> {
    let Some(bbox) = result.boundingbox else {
        return Ok(None);
    };
    if bbox.len() != 4 {
        return Ok(None);
    }

    let south = parse_coord(&bbox[0])?;
    let north = parse_coord(&bbox[1])?;
    let west = parse_coord(&bbox[2])?;
    let east = parse_coord(&bbox[3])?;

    Ok(Some(GeoBounds {
        center: GeoPoint {
            latitude: parse_coord(&result.lat)?,
            longitude: parse_coord(&result.lon)?,
        },
        low: GeoPoint {
            latitude: south,
            longitude: west,
        },
        high: GeoPoint {
            latitude: north,
            longitude: east,
        },
    }))
}

fn parse_coord(raw: &str) -> Result<f64> {
    raw.parse()
        .map_err(|_| AppError::fetch("geocoder", format!("invalid coordinate '{raw}'")))
}

#[derive(Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    boundingbox: Option<Vec<String>>,
}
