// src/models/mod.rs

//! Domain models for the digest application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod content;
mod digest;
mod geo;
mod paper;
mod place;

// Re-export all public types
pub use config::{
    ApiConfig, ArxivConfig, AuthConfig, Config, EmailConfig, Endpoints, HttpConfig, S3Config,
    StorageMode, TextSearchConfig,
};
pub use content::{Horoscope, Poem, Quote, Recipe, SolarSchedule, Verse, WordOfTheDay};
pub use digest::DigestContext;
pub use geo::{GeoBounds, GeoPoint};
pub use paper::Paper;
pub use place::{Place, Review};
