//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sender, recipients and rendering format
    pub email: EmailConfig,

    /// HTTP client behavior settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Location and content source parameters
    #[serde(default)]
    pub api: ApiConfig,

    /// Paper search and PDF storage settings
    #[serde(default)]
    pub arxiv: ArxivConfig,

    /// S3 upload settings (used when arxiv.storage_type = "s3")
    #[serde(default)]
    pub s3: S3Config,

    /// OAuth credential and token file locations
    #[serde(default)]
    pub auth: AuthConfig,

    /// External service URLs
    #[serde(default)]
    pub endpoints: Endpoints,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.email.sender.trim().is_empty() {
            return Err(AppError::validation("email.sender is empty"));
        }
        if self.email.recipients.is_empty() {
            return Err(AppError::validation("No recipients defined"));
        }
        if self.email.recipients.iter().any(|r| r.trim().is_empty()) {
            return Err(AppError::validation("email.recipients contains an empty address"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.api.text_search.page_size == 0 {
            return Err(AppError::validation("api.text_search.page_size must be > 0"));
        }
        if self.arxiv.query.trim().is_empty() {
            return Err(AppError::validation("arxiv.query is empty"));
        }
        if self.arxiv.max_results == 0 {
            return Err(AppError::validation("arxiv.max_results must be > 0"));
        }
        if self.arxiv.random_k == 0 {
            return Err(AppError::validation("arxiv.random_k must be > 0"));
        }
        if self.arxiv.storage_type == StorageMode::S3 && self.s3.bucket.trim().is_empty() {
            return Err(AppError::validation(
                "s3.bucket is required when arxiv.storage_type = \"s3\"",
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
            http: HttpConfig::default(),
            api: ApiConfig::default(),
            arxiv: ArxivConfig::default(),
            s3: S3Config::default(),
            auth: AuthConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Sender, recipients and rendering format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Sender address for outgoing mail
    pub sender: String,

    /// Recipient addresses, optionally in "Name <addr>" form
    pub recipients: Vec<String>,

    /// Body format: "html" or "plain" (unknown values fall back to plain)
    #[serde(default = "defaults::email_format")]
    pub format: String,

    /// Subject line with a `{name}` placeholder for the recipient
    #[serde(default = "defaults::subject_template")]
    pub subject_template: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            sender: String::new(),
            recipients: Vec::new(),
            format: defaults::email_format(),
            subject_template: defaults::subject_template(),
        }
    }
}

/// HTTP client behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Default request timeout in seconds (slow sources override per request)
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Location and content source parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Region to geocode for the solar schedule and place search
    #[serde(default = "defaults::location")]
    pub location: String,

    /// Country code hint for geocoding
    #[serde(default = "defaults::country_code")]
    pub country_code: String,

    /// Zodiac sign for the daily horoscope
    #[serde(default = "defaults::horoscope_sign")]
    pub horoscope_sign: String,

    /// Place text-search parameters
    #[serde(default)]
    pub text_search: TextSearchConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            location: defaults::location(),
            country_code: defaults::country_code(),
            horoscope_sign: defaults::horoscope_sign(),
            text_search: TextSearchConfig::default(),
        }
    }
}

/// Place text-search parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSearchConfig {
    /// Place type filter (e.g., "restaurant"); empty disables the filter
    #[serde(default = "defaults::place_type")]
    pub place_type: String,

    /// Maximum number of places to return
    #[serde(default = "defaults::page_size")]
    pub page_size: usize,

    /// Minimum rating filter, omitted from the request when unset
    #[serde(default)]
    pub min_rating: Option<f64>,

    /// Price level filters, omitted from the request when empty
    #[serde(default)]
    pub price_levels: Vec<String>,
}

impl Default for TextSearchConfig {
    fn default() -> Self {
        Self {
            place_type: defaults::place_type(),
            page_size: defaults::page_size(),
            min_rating: None,
            price_levels: Vec::new(),
        }
    }
}

/// Paper search and PDF storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArxivConfig {
    /// Search query (matched against all fields)
    #[serde(default = "defaults::arxiv_query")]
    pub query: String,

    /// Number of entries to request from the feed
    #[serde(default = "defaults::arxiv_max_results")]
    pub max_results: usize,

    /// Number of entries to sample from the feed
    #[serde(default = "defaults::arxiv_random_k")]
    pub random_k: usize,

    /// Whether to download PDFs for sampled papers
    #[serde(default = "defaults::download_papers")]
    pub download_papers: bool,

    /// Where downloaded PDFs go
    #[serde(default)]
    pub storage_type: StorageMode,

    /// Root directory for locally stored PDFs
    #[serde(default = "defaults::storage_dir")]
    pub storage_dir: String,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            query: defaults::arxiv_query(),
            max_results: defaults::arxiv_max_results(),
            random_k: defaults::arxiv_random_k(),
            download_papers: defaults::download_papers(),
            storage_type: StorageMode::default(),
            storage_dir: defaults::storage_dir(),
        }
    }
}

/// PDF storage destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    #[default]
    Local,
    S3,
}

/// S3 upload settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3Config {
    /// Bucket name
    #[serde(default)]
    pub bucket: String,

    /// Region override; the default AWS provider chain applies when unset
    #[serde(default)]
    pub region: Option<String>,
}

/// OAuth credential and token file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Installed-app client secret file (downloaded from the API console)
    #[serde(default = "defaults::credentials_path")]
    pub credentials_path: PathBuf,

    /// Cached token file, created on first consent
    #[serde(default = "defaults::token_path")]
    pub token_path: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credentials_path: defaults::credentials_path(),
            token_path: defaults::token_path(),
        }
    }
}

/// External service URLs. Overridable so tests can point at local stubs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoints {
    /// Sunrise/sunset schedule API
    #[serde(default = "defaults::solar_url")]
    pub solar: String,

    /// Zen quote API
    #[serde(default = "defaults::zen_quote_url")]
    pub zen_quote: String,

    /// Stoic quote API
    #[serde(default = "defaults::stoic_quote_url")]
    pub stoic_quote: String,

    /// Random verse API
    #[serde(default = "defaults::verse_url")]
    pub verse: String,

    /// Random fact API
    #[serde(default = "defaults::fact_url")]
    pub fact: String,

    /// Random recipe API
    #[serde(default = "defaults::recipe_url")]
    pub recipe: String,

    /// Daily horoscope API
    #[serde(default = "defaults::horoscope_url")]
    pub horoscope: String,

    /// Word-of-the-day page
    #[serde(default = "defaults::word_of_the_day_url")]
    pub word_of_the_day: String,

    /// Poem-of-the-day page
    #[serde(default = "defaults::poem_url")]
    pub poem: String,

    /// Paper search feed
    #[serde(default = "defaults::arxiv_url")]
    pub arxiv: String,

    /// Place text-search API
    #[serde(default = "defaults::places_search_url")]
    pub places_search: String,

    /// Place photo media base (photo name is appended)
    #[serde(default = "defaults::places_media_base")]
    pub places_media_base: String,

    /// Geocoding search API
    #[serde(default = "defaults::nominatim_url")]
    pub nominatim: String,

    /// Mail send API
    #[serde(default = "defaults::gmail_send_url")]
    pub gmail_send: String,

    /// Cat GIF embedded in the digest, fetched by the mail client
    #[serde(default = "defaults::cat_gif_url")]
    pub cat_gif: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            solar: defaults::solar_url(),
            zen_quote: defaults::zen_quote_url(),
            stoic_quote: defaults::stoic_quote_url(),
            verse: defaults::verse_url(),
            fact: defaults::fact_url(),
            recipe: defaults::recipe_url(),
            horoscope: defaults::horoscope_url(),
            word_of_the_day: defaults::word_of_the_day_url(),
            poem: defaults::poem_url(),
            arxiv: defaults::arxiv_url(),
            places_search: defaults::places_search_url(),
            places_media_base: defaults::places_media_base(),
            nominatim: defaults::nominatim_url(),
            gmail_send: defaults::gmail_send_url(),
            cat_gif: defaults::cat_gif_url(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Email defaults
    pub fn email_format() -> String {
        "html".into()
    }
    pub fn subject_template() -> String {
        "Good Morning, {name}!".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; sunup/1.0)".into()
    }
    pub fn timeout() -> u64 {
        10
    }

    // API defaults
    pub fn location() -> String {
        "Singapore".into()
    }
    pub fn country_code() -> String {
        "SG".into()
    }
    pub fn horoscope_sign() -> String {
        "capricorn".into()
    }
    pub fn place_type() -> String {
        "restaurant".into()
    }
    pub fn page_size() -> usize {
        3
    }

    // Paper search defaults
    pub fn arxiv_query() -> String {
        "large language models".into()
    }
    pub fn arxiv_max_results() -> usize {
        50
    }
    pub fn arxiv_random_k() -> usize {
        3
    }
    pub fn download_papers() -> bool {
        true
    }
    pub fn storage_dir() -> String {
        "storage".into()
    }

    // Auth defaults
    pub fn credentials_path() -> PathBuf {
        PathBuf::from("credentials.json")
    }
    pub fn token_path() -> PathBuf {
        PathBuf::from("token.json")
    }

    // Endpoint defaults
    pub fn solar_url() -> String {
        "https://api.sunrisesunset.io/json".into()
    }
    pub fn zen_quote_url() -> String {
        "https://zenquotes.io/api/random".into()
    }
    pub fn stoic_quote_url() -> String {
        "https://stoic.tekloon.net/stoic-quote".into()
    }
    pub fn verse_url() -> String {
        "https://bible-api.com/data/web/random".into()
    }
    pub fn fact_url() -> String {
        "https://uselessfacts.jsph.pl/api/v2/facts/random".into()
    }
    pub fn recipe_url() -> String {
        "https://www.themealdb.com/api/json/v1/1/random.php".into()
    }
    pub fn horoscope_url() -> String {
        "https://horoscope-app-api.vercel.app/api/v1/get-horoscope/daily".into()
    }
    pub fn word_of_the_day_url() -> String {
        "https://www.dictionary.com/e/word-of-the-day/".into()
    }
    pub fn poem_url() -> String {
        "https://www.poetryfoundation.org/poems/poem-of-the-day".into()
    }
    pub fn arxiv_url() -> String {
        "http://export.arxiv.org/api/query".into()
    }
    pub fn places_search_url() -> String {
        "https://places.googleapis.com/v1/places:searchText".into()
    }
    pub fn places_media_base() -> String {
        "https://places.googleapis.com/v1".into()
    }
    pub fn nominatim_url() -> String {
        "https://nominatim.openstreetmap.org/search".into()
    }
    pub fn gmail_send_url() -> String {
        "https://gmail.googleapis.com/gmail/v1/users/me/messages/send".into()
    }
    pub fn cat_gif_url() -> String {
        "https://cataas.com/cat/gif".into()
    }
}
