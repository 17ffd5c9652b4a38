//! Aggregated digest context for one run.

use serde::{Deserialize, Serialize};

use super::content::{Horoscope, Poem, Quote, Recipe, SolarSchedule, Verse, WordOfTheDay};
use super::paper::Paper;
use super::place::Place;

/// Everything a rendered digest can show, assembled once per run.
///
/// Fetch outcomes are fail-soft: an unavailable source leaves its field
/// `None` (or the vec empty) and the template skips that section. The
/// context is cloned per recipient so personalization never leaks between
/// recipients.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DigestContext {
    /// Run timestamp, "YYYY-MM-DD HH:MM:SS"
    pub datetime: String,

    pub solar_schedule: Option<SolarSchedule>,
    pub zen_quote: Option<Quote>,
    pub stoic_quote: Option<Quote>,
    pub bible_verse: Option<Verse>,
    pub interesting_fact: Option<String>,
    pub recipe: Option<Recipe>,
    pub wod: Option<WordOfTheDay>,
    pub poem: Option<Poem>,
    pub horoscope: Option<Horoscope>,

    /// Query the papers were searched with
    pub arxiv_query: String,

    /// Sampled papers, possibly with stored-PDF paths backfilled
    pub arxiv_papers: Vec<Paper>,

    /// Places found for `text_query`
    pub places: Vec<Place>,

    /// Place query actually used (recipe name, or the fallback dish)
    pub text_query: String,

    /// Cat GIF media URL embedded in the digest
    pub cat_gif: String,

    /// Display name of the recipient this copy is rendered for
    pub recipient_name: String,
}

impl DigestContext {
    /// Clone the context for one recipient.
    pub fn for_recipient(&self, name: &str) -> Self {
        let mut ctx = self.clone();
        ctx.recipient_name = name.to_string();
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn for_recipient_personalizes_a_copy() {
        let mut base = DigestContext::default();
        base.interesting_fact = Some("Honey never spoils.".to_string());

        let copy = base.for_recipient("Alice");
        assert_eq!(copy.recipient_name, "Alice");
        assert_eq!(copy.interesting_fact.as_deref(), Some("Honey never spoils."));
        assert!(base.recipient_name.is_empty());
    }
}
