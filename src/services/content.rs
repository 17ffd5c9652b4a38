// src/services/content.rs

//! JSON content sources for the digest.
//!
//! Every fetcher follows the same contract: one request, a fixed per-source
//! timeout, no retries. Any failure (transport, non-2xx status, malformed
//! body, absent field) is caught at the fetcher boundary, logged with source
//! context, and surfaces as `None` so the run continues without the section.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Config, Horoscope, Quote, Recipe, SolarSchedule, Verse};

/// Timeout for the quick JSON APIs.
const API_TIMEOUT_SECS: u64 = 10;

/// Fetches the JSON-backed digest sections.
pub struct ContentFetcher {
    config: Arc<Config>,
    client: Client,
}

impl ContentFetcher {
    /// Create a new fetcher sharing the given HTTP client.
    pub fn new(config: Arc<Config>, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetch the sunrise/sunset schedule for a coordinate.
    pub async fn solar_schedule(&self, latitude: f64, longitude: f64) -> Option<SolarSchedule> {
        match self.fetch_solar(latitude, longitude).await {
            Ok(schedule) => Some(schedule),
            Err(error) => {
                log::error!("Failed to fetch solar schedule: {error}");
                None
            }
        }
    }

    /// Fetch a random zen quote.
    pub async fn zen_quote(&self) -> Option<Quote> {
        match self.fetch_zen_quote().await {
            Ok(quote) => Some(quote),
            Err(error) => {
                log::error!("Failed to fetch zen quote: {error}");
                None
            }
        }
    }

    /// Fetch a random stoic quote.
    pub async fn stoic_quote(&self) -> Option<Quote> {
        match self.fetch_stoic_quote().await {
            Ok(quote) => Some(quote),
            Err(error) => {
                log::error!("Failed to fetch stoic quote: {error}");
                None
            }
        }
    }

    /// Fetch a random verse.
    pub async fn bible_verse(&self) -> Option<Verse> {
        match self.fetch_verse().await {
            Ok(verse) => Some(verse),
            Err(error) => {
                log::error!("Failed to fetch verse: {error}");
                None
            }
        }
    }

    /// Fetch a random fact.
    pub async fn useless_fact(&self) -> Option<String> {
        match self.fetch_fact().await {
            Ok(fact) => Some(fact),
            Err(error) => {
                log::error!("Failed to fetch fact: {error}");
                None
            }
        }
    }

    /// Fetch a random recipe.
    pub async fn recipe_of_the_day(&self) -> Option<Recipe> {
        match self.fetch_recipe().await {
            Ok(recipe) => Some(recipe),
            Err(error) => {
                log::error!("Failed to fetch recipe: {error}");
                None
            }
        }
    }

    /// Fetch the daily horoscope for a zodiac sign.
    pub async fn horoscope(&self, sign: &str) -> Option<Horoscope> {
        match self.fetch_horoscope(sign).await {
            Ok(horoscope) => Some(horoscope),
            Err(error) => {
                log::error!("Failed to fetch horoscope for '{sign}': {error}");
                None
            }
        }
    }

    async fn fetch_solar(&self, latitude: f64, longitude: f64) -> Result<SolarSchedule> {
        let body = self
            .client
            .get(&self.config.endpoints.solar)
            .query(&[("lat", latitude), ("lng", longitude)])
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_solar_schedule(&body)
    }

    async fn fetch_zen_quote(&self) -> Result<Quote> {
        let body = self.fetch_body(&self.config.endpoints.zen_quote).await?;
        parse_zen_quote(&body)
    }

    async fn fetch_stoic_quote(&self) -> Result<Quote> {
        let body = self.fetch_body(&self.config.endpoints.stoic_quote).await?;
        parse_stoic_quote(&body)
    }

    async fn fetch_verse(&self) -> Result<Verse> {
        let body = self.fetch_body(&self.config.endpoints.verse).await?;
        parse_verse(&body)
    }

    async fn fetch_fact(&self) -> Result<String> {
        let body = self.fetch_body(&self.config.endpoints.fact).await?;
        parse_fact(&body)
    }

    async fn fetch_recipe(&self) -> Result<Recipe> {
        let body = self.fetch_body(&self.config.endpoints.recipe).await?;
        parse_recipe(&body)
    }

    async fn fetch_horoscope(&self, sign: &str) -> Result<Horoscope> {
        let body = self
            .client
            .get(&self.config.endpoints.horoscope)
            .query(&[("sign", sign)])
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_horoscope(&body, sign)
    }

    /// One GET with the standard API timeout, returning the response body.
    async fn fetch_body(&self, url: &str) -> Result<String> {
        let body = self
            .client
            .get(url)
            .timeout(Duration::from_secs(API_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

// --- Response payloads ---

#[derive(Deserialize)]
struct SolarResponse {
    results: serde_json::Map<String, Value>,
}

#[derive(Deserialize)]
struct ZenQuoteDto {
    q: String,
    #[serde(default)]
    a: Option<String>,
}

#[derive(Deserialize)]
struct StoicResponse {
    data: StoicQuoteDto,
}

#[derive(Deserialize)]
struct StoicQuoteDto {
    quote: String,
    #[serde(default)]
    author: Option<String>,
}

#[derive(Deserialize)]
struct VerseResponse {
    random_verse: VerseDto,
}

#[derive(Deserialize)]
struct VerseDto {
    text: String,
    #[serde(default = "unknown_book")]
    book: String,
    #[serde(default)]
    chapter: u32,
    #[serde(default)]
    verse: u32,
}

fn unknown_book() -> String {
    "Unknown Book".to_string()
}

#[derive(Deserialize)]
struct FactResponse {
    text: String,
}

#[derive(Deserialize)]
struct RecipeResponse {
    meals: Vec<MealDto>,
}

#[derive(Deserialize)]
struct MealDto {
    #[serde(rename = "strMeal")]
    name: String,
    #[serde(rename = "strInstructions")]
    instructions: String,
    #[serde(rename = "strMealThumb")]
    image_url: String,
    #[serde(rename = "strYoutube", default)]
    youtube_url: Option<String>,
}

#[derive(Deserialize)]
struct HoroscopeResponse {
    data: HoroscopeDto,
}

#[derive(Deserialize)]
struct HoroscopeDto {
    horoscope_data: String,
    date: String,
}

// --- Parsers ---

fn parse_solar_schedule(body: &str) -> Result<SolarSchedule> {
    let response: SolarResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .iter()
        .map(|(key, value)| (key.clone(), stringify(value)))
        .collect())
}

fn parse_zen_quote(body: &str) -> Result<Quote> {
    let quotes: Vec<ZenQuoteDto> = serde_json::from_str(body)?;
    let first = quotes
        .into_iter()
        .next()
        .ok_or_else(|| AppError::fetch("zen quote", "empty response array"))?;
    Ok(Quote {
        quote: first.q,
        author: first.a.unwrap_or_else(|| "Unknown".to_string()),
    })
}

fn parse_stoic_quote(body: &str) -> Result<Quote> {
    let response: StoicResponse = serde_json::from_str(body)?;
    Ok(Quote {
        quote: response.data.quote,
        author: response.data.author.unwrap_or_else(|| "Unknown".to_string()),
    })
}

fn parse_verse(body: &str) -> Result<Verse> {
    let response: VerseResponse = serde_json::from_str(body)?;
    let v = response.random_verse;
    Ok(Verse {
        reference: format!("{} {}:{}", v.book, v.chapter, v.verse),
        verse: v.text,
    })
}

fn parse_fact(body: &str) -> Result<String> {
    let response: FactResponse = serde_json::from_str(body)?;
    Ok(response.text)
}

fn parse_recipe(body: &str) -> Result<Recipe> {
    let response: RecipeResponse = serde_json::from_str(body)?;
    let meal = response
        .meals
        .into_iter()
        .next()
        .ok_or_else(|| AppError::fetch("recipe", "empty meals array"))?;
    Ok(Recipe {
        name: meal.name,
        instructions: meal.instructions,
        image_url: meal.image_url,
        youtube_url: meal.youtube_url.unwrap_or_default(),
    })
}

fn parse_horoscope(body: &str, sign: &str) -> Result<Horoscope> {
    let response: HoroscopeResponse = serde_json::from_str(body)?;
    Ok(Horoscope {
        sign: sign.to_string(),
        prediction: response.data.horoscope_data,
        date: response.data.date,
    })
}

/// Render a JSON value as plain text (strings lose their quotes).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response on an ephemeral port.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = [0u8; 4096];
            let _ = socket.read(&mut buffer).await;
            let reply = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{addr}/source")
    }

    fn fetcher_for(endpoints: &str) -> ContentFetcher {
        let toml = format!(
            r#"
            [email]
            sender = "digest@example.com"
            recipients = ["alice@example.com"]

            [endpoints]
            {endpoints}
            "#
        );
        let config: Config = toml::from_str(&toml).unwrap();
        ContentFetcher::new(Arc::new(config), Client::new())
    }

    #[tokio::test]
    async fn server_error_surfaces_as_none() {
        let url = serve_once("500 Internal Server Error", "{}").await;
        let fetcher = fetcher_for(&format!("zen_quote = \"{url}\""));
        assert!(fetcher.zen_quote().await.is_none());
    }

    #[tokio::test]
    async fn garbage_body_surfaces_as_none() {
        let url = serve_once("200 OK", "<html>maintenance</html>").await;
        let fetcher = fetcher_for(&format!("fact = \"{url}\""));
        assert!(fetcher.useless_fact().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_source_surfaces_as_none() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = format!("http://{}/source", listener.local_addr().unwrap());
        drop(listener);

        let fetcher = fetcher_for(&format!("stoic_quote = \"{dead}\""));
        assert!(fetcher.stoic_quote().await.is_none());
    }

    #[test]
    fn solar_payload_keeps_all_result_fields() {
        let body = r#"{"results":{"sunrise":"6:58:14 AM","sunset":"7:10:49 PM","day_length":"12:12:35","utc_offset":480},"status":"OK"}"#;
        let schedule = parse_solar_schedule(body).unwrap();
        assert_eq!(schedule.get("sunrise").map(String::as_str), Some("6:58:14 AM"));
        assert_eq!(schedule.get("utc_offset").map(String::as_str), Some("480"));
        assert_eq!(schedule.len(), 4);
    }

    #[test]
    fn solar_payload_without_results_fails() {
        assert!(parse_solar_schedule(r#"{"status":"OK"}"#).is_err());
    }

    #[test]
    fn zen_payload_takes_first_quote() {
        let body = r#"[{"q":"Sit quietly.","a":"Basho"},{"q":"Other","a":"Else"}]"#;
        let quote = parse_zen_quote(body).unwrap();
        assert_eq!(quote.quote, "Sit quietly.");
        assert_eq!(quote.author, "Basho");
    }

    #[test]
    fn zen_payload_defaults_missing_author() {
        let quote = parse_zen_quote(r#"[{"q":"Sit quietly."}]"#).unwrap();
        assert_eq!(quote.author, "Unknown");
    }

    #[test]
    fn stoic_payload_parses_nested_data() {
        let body = r#"{"data":{"quote":"Waste no more time.","author":"Marcus Aurelius"}}"#;
        let quote = parse_stoic_quote(body).unwrap();
        assert_eq!(quote.author, "Marcus Aurelius");
    }

    #[test]
    fn verse_payload_builds_reference() {
        let body = r#"{"random_verse":{"book":"John","chapter":3,"verse":16,"text":"For God so loved the world."}}"#;
        let verse = parse_verse(body).unwrap();
        assert_eq!(verse.reference, "John 3:16");
        assert_eq!(verse.verse, "For God so loved the world.");
    }

    #[test]
    fn verse_payload_without_text_fails() {
        let body = r#"{"random_verse":{"book":"John","chapter":3,"verse":16}}"#;
        assert!(parse_verse(body).is_err());
    }

    #[test]
    fn recipe_payload_takes_first_meal() {
        let body = r#"{"meals":[{"strMeal":"Laksa","strInstructions":"Simmer.","strMealThumb":"https://img.example/laksa.jpg","strYoutube":""}]}"#;
        let recipe = parse_recipe(body).unwrap();
        assert_eq!(recipe.name, "Laksa");
        assert_eq!(recipe.youtube_url, "");
    }

    #[test]
    fn recipe_payload_with_empty_meals_fails() {
        assert!(parse_recipe(r#"{"meals":[]}"#).is_err());
    }

    #[test]
    fn horoscope_payload_carries_requested_sign() {
        let body = r#"{"data":{"date":"Aug 24, 2026","horoscope_data":"A good day to start."},"status":200,"success":true}"#;
        let horoscope = parse_horoscope(body, "capricorn").unwrap();
        assert_eq!(horoscope.sign, "capricorn");
        assert_eq!(horoscope.prediction, "A good day to start.");
    }

    #[test]
    fn garbage_body_is_an_error() {
        assert!(parse_fact("<html>not json</html>").is_err());
    }
}
