//! Per-source content records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Sunrise/sunset schedule as returned by the provider, keyed by field name.
///
/// The provider's `results` object is carried wholesale so the template can
/// list every field it offers (sunrise, sunset, golden hour and so on).
pub type SolarSchedule = BTreeMap<String, String>;

/// A quotation with attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Quote {
    /// Quotation text
    pub quote: String,

    /// Attributed author ("Unknown" when the source omits one)
    pub author: String,
}

/// A randomly drawn verse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Verse {
    /// Citation in "Book chapter:verse" form
    pub reference: String,

    /// Verse text
    pub verse: String,
}

/// A recipe suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipe {
    /// Dish name, also used as the place-search query
    pub name: String,

    /// Preparation instructions
    pub instructions: String,

    /// Photo of the finished dish
    pub image_url: String,

    /// Video walkthrough (empty string when the source omits one)
    pub youtube_url: String,
}

/// Word of the day with its definition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordOfTheDay {
    pub word: String,
    pub part_of_speech: String,
    pub definition: String,
}

/// Poem of the day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Poem {
    pub title: String,

    /// Poet name ("Unknown" when the page omits one)
    pub author: String,

    /// Poem body with line breaks preserved as newlines
    pub poem: String,
}

/// Daily horoscope for a zodiac sign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Horoscope {
    /// Sign the prediction was requested for
    pub sign: String,

    /// Prediction text
    pub prediction: String,

    /// Date the prediction applies to
    pub date: String,
}
