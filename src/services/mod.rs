//! Service layer for the digest application.
//!
//! This module contains the business logic for:
//! - JSON content sources (`ContentFetcher`)
//! - Page scraping sources (`PageScraper`)
//! - Paper search and sampling (`ArxivClient`)
//! - Place search and enrichment (`PlacesClient`)
//! - Geocoding (`Geocoder`)

mod arxiv;
mod content;
mod geocode;
mod places;
mod scrape;

pub use arxiv::ArxivClient;
pub use content::ContentFetcher;
pub use geocode::Geocoder;
pub use places::PlacesClient;
pub use scrape::PageScraper;
