// src/pipeline/digest.rs

//! Digest assembly and delivery.
//!
//! One run fetches every content source in a fixed order, stores paper
//! PDFs, then renders and sends one personalized email per recipient.
//! Content sources fail soft: a broken source drops its section, never
//! the run. Only unusable configuration or credentials are fatal.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use reqwest::Client;

use crate::error::Result;
use crate::mail::{EmailBody, EmailFormat, GmailAuth, GmailMailer, Mailer, OutgoingEmail};
use crate::models::{Config, DigestContext, GeoBounds, Paper, Place};
use crate::render::{render_body, render_subject};
use crate::services::{ArxivClient, ContentFetcher, Geocoder, PageScraper, PlacesClient};
use crate::storage::{StoredPdf, create_store};
use crate::utils::http::create_async_client;
use crate::utils::{display_name, slugify};

/// Environment variable carrying the places API key.
pub const PLACES_API_KEY_VAR: &str = "GOOGLE_MAPS_API_KEY";

/// Dish searched for when the recipe query finds nothing.
const FALLBACK_PLACE_QUERY: &str = "chicken rice";

const PDF_TIMEOUT_SECS: u64 = 30;

/// Outcome counts for one delivery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Run the full digest: fetch, store PDFs, render and send.
///
/// With `dry_run` set, everything up to rendering happens but no
/// authentication or sending takes place.
pub async fn run(config: Arc<Config>, dry_run: bool) -> Result<RunSummary> {
    let client = create_async_client(&config.http)?;
    let mut rng = StdRng::from_entropy();

    // A broken credential setup fails here, before any fetching.
    let mailer = if dry_run {
        None
    } else {
        let auth = GmailAuth::from_config(&config.auth).await?;
        let mailer = GmailMailer::new(
            client.clone(),
            auth,
            &config.endpoints.gmail_send,
            &config.email.sender,
        )?;
        mailer.authorize().await?;
        Some(mailer)
    };

    let mut ctx = fetch_content(&config, &client, &mut rng).await;

    if config.arxiv.download_papers {
        store_papers(&config, &client, &mut ctx.arxiv_papers).await?;
    }

    match mailer {
        Some(mailer) => deliver(&config, &mailer, &ctx).await,
        None => {
            log::info!("Dry run: rendering digests without sending.");
            let format = EmailFormat::parse_or_plain(&config.email.format);
            let mut summary = RunSummary::default();
            for recipient in &config.email.recipients {
                let name = display_name(recipient);
                let body = render_body(&ctx.for_recipient(&name), format)?;
                let size = match &body {
                    EmailBody::Plain(text) => text.len(),
                    EmailBody::Html { html, .. } => html.len(),
                };
                log::info!("Would send a {size}-byte digest to {recipient}");
                summary.skipped += 1;
            }
            Ok(summary)
        }
    }
}

/// Fetch everything and return the assembled context without sending.
pub async fn fetch_digest(config: Arc<Config>) -> Result<DigestContext> {
    let client = create_async_client(&config.http)?;
    let mut rng = StdRng::from_entropy();
    Ok(fetch_content(&config, &client, &mut rng).await)
}

/// Fetch every content source, in the same order every run.
///
/// Sources run sequentially on purpose: the volume is tiny and the
/// ordering keeps logs readable and the public services unbothered.
pub async fn fetch_content(
    config: &Arc<Config>,
    client: &Client,
    rng: &mut impl Rng,
) -> DigestContext {
    let mut ctx = DigestContext::default();
    ctx.datetime = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    ctx.arxiv_query = config.arxiv.query.clone();
    ctx.cat_gif = config.endpoints.cat_gif.clone();

    log::info!(
        "Retrieving geolocation details for '{}' ({}).",
        config.api.location,
        config.api.country_code
    );
    let geocoder = Geocoder::new(config.clone(), client.clone());
    let bounds = match geocoder
        .resolve(
            &config.api.location,
            std::slice::from_ref(&config.api.country_code),
        )
        .await
    {
        Some(bounds) => bounds,
        None => {
            log::warn!(
                "Could not resolve '{}'. Defaulting to Singapore coordinates.",
                config.api.location
            );
            GeoBounds::singapore()
        }
    };

    log::info!("Retrieving content from the configured sources...");
    let content = ContentFetcher::new(config.clone(), client.clone());
    ctx.solar_schedule = content
        .solar_schedule(bounds.center.latitude, bounds.center.longitude)
        .await;
    ctx.zen_quote = content.zen_quote().await;
    ctx.stoic_quote = content.stoic_quote().await;
    ctx.bible_verse = content.bible_verse().await;
    ctx.interesting_fact = content.useless_fact().await;
    ctx.recipe = content.recipe_of_the_day().await;

    let arxiv = ArxivClient::new(config.clone(), client.clone());
    ctx.arxiv_papers = arxiv
        .search(
            &config.arxiv.query,
            config.arxiv.max_results,
            config.arxiv.random_k,
            rng,
        )
        .await;

    let scraper = PageScraper::new(config.clone(), client.clone());
    ctx.wod = scraper.word_of_the_day().await;
    ctx.poem = scraper.poem_of_the_day().await;
    ctx.horoscope = content.horoscope(&config.api.horoscope_sign).await;

    let primary_query = ctx.recipe.as_ref().map(|r| r.name.clone());
    match std::env::var(PLACES_API_KEY_VAR) {
        Ok(key) if !key.is_empty() => {
            let places = PlacesClient::new(config.clone(), client.clone(), key);
            let (found, used_query) =
                find_places(&places, primary_query.as_deref(), &bounds).await;
            ctx.places = found;
            ctx.text_query = used_query;
        }
        _ => {
            log::warn!("{PLACES_API_KEY_VAR} is not set; skipping the places section.");
            ctx.text_query = primary_query.unwrap_or_else(|| FALLBACK_PLACE_QUERY.to_string());
        }
    }

    ctx
}

/// Search with the recipe name, retrying once with the fallback dish when
/// nothing comes back. At most two searches, then accept the outcome.
async fn find_places(
    client: &PlacesClient,
    primary: Option<&str>,
    bounds: &GeoBounds,
) -> (Vec<Place>, String) {
    let query = primary.unwrap_or(FALLBACK_PLACE_QUERY);
    let places = client.search_text(query, bounds).await;
    if !places.is_empty() || query == FALLBACK_PLACE_QUERY {
        return (places, query.to_string());
    }

    log::warn!("No places found for '{query}'. Retrying with '{FALLBACK_PLACE_QUERY}'.");
    let places = client.search_text(FALLBACK_PLACE_QUERY, bounds).await;
    (places, FALLBACK_PLACE_QUERY.to_string())
}

/// Download and persist PDFs for papers that advertise one, backfilling
/// their storage paths. Per-paper failures warn and move on.
pub async fn store_papers(config: &Config, client: &Client, papers: &mut [Paper]) -> Result<()> {
    if papers.iter().all(|p| p.pdf_link.is_none()) {
        return Ok(());
    }

    let store = create_store(config).await?;
    let dir_slug = query_dir_slug(&config.arxiv.query);

    for paper in papers.iter_mut() {
        let Some(link) = paper.pdf_link.clone() else {
            continue;
        };
        let file_name = format!("{}.pdf", slugify(&paper.title));

        match download_pdf(client, &link).await {
            Ok(response) => match store.store(&dir_slug, &file_name, response).await {
                Ok(StoredPdf::Local(path)) => paper.local_path = Some(path),
                Ok(StoredPdf::S3(key)) => paper.s3_path = Some(key),
                Err(error) => {
                    log::warn!("Failed to store the PDF for '{}': {error}", paper.title);
                }
            },
            Err(error) => {
                log::warn!("Failed to download the PDF for '{}': {error}", paper.title);
            }
        }
    }
    Ok(())
}

async fn download_pdf(client: &Client, url: &str) -> Result<reqwest::Response> {
    let response = client
        .get(url)
        .timeout(Duration::from_secs(PDF_TIMEOUT_SECS))
        .send()
        .await?
        .error_for_status()?;
    Ok(response)
}

/// Directory slug for the paper query: lowercased, spaces underscored.
fn query_dir_slug(query: &str) -> String {
    query.to_lowercase().replace(' ', "_")
}

/// Render and send one personalized digest per recipient.
///
/// A failed send is logged and counted; it never aborts the remaining
/// recipients.
pub async fn deliver(
    config: &Config,
    mailer: &dyn Mailer,
    ctx: &DigestContext,
) -> Result<RunSummary> {
    let format = EmailFormat::parse_or_plain(&config.email.format);
    let attachments = load_attachments(&ctx.arxiv_papers).await;

    let mut summary = RunSummary::default();
    for recipient in &config.email.recipients {
        if !recipient.contains('@') {
            log::warn!("Skipping recipient with no usable address: {recipient}");
            summary.skipped += 1;
            continue;
        }

        let name = display_name(recipient);
        let personalized = ctx.for_recipient(&name);
        let body = render_body(&personalized, format)?;
        let subject = render_subject(&config.email.subject_template, &name);

        let email = OutgoingEmail {
            to: recipient.clone(),
            subject,
            body,
            attachments: attachments.clone(),
        };

        match mailer.send(&email).await {
            Ok(id) => {
                if id.is_empty() {
                    log::info!("Sent digest to {recipient}");
                } else {
                    log::info!("Sent digest to {recipient} (message id {id})");
                }
                summary.sent += 1;
            }
            Err(error) => {
                log::error!("Failed to send the digest to {recipient}: {error}");
                summary.failed += 1;
            }
        }
    }

    log::info!(
        "Digest run complete: {} sent, {} failed, {} skipped.",
        summary.sent,
        summary.failed,
        summary.skipped
    );
    Ok(summary)
}

/// Read locally stored PDFs for attachment. An unreadable file drops the
/// attachment with a warning.
async fn load_attachments(papers: &[Paper]) -> Vec<(String, Vec<u8>)> {
    let mut attachments = Vec::new();
    for paper in papers {
        let Some(path) = &paper.local_path else {
            continue;
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "paper.pdf".to_string());
                attachments.push((file_name, bytes));
            }
            Err(error) => {
                log::warn!("Could not read the stored PDF {}: {error}", path.display());
            }
        }
    }
    attachments
}
