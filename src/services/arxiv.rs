// src/services/arxiv.rs

//! Paper search over the arXiv Atom feed.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use rand::seq::SliceRandom;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, Paper};

/// The feed endpoint is slow for broad queries.
const SEARCH_TIMEOUT_SECS: u64 = 30;

/// Searches the paper feed and samples a handful of entries.
pub struct ArxivClient {
    config: Arc<Config>,
    client: Client,
}

impl ArxivClient {
    /// Create a new client sharing the given HTTP client.
    pub fn new(config: Arc<Config>, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetch up to `max_results` entries for `query` and sample `random_k`
    /// of them uniformly without replacement.
    ///
    /// A feed with fewer entries than `random_k` yields all of them with a
    /// warning; a hard failure yields an empty list, never an error.
    pub async fn search(
        &self,
        query: &str,
        max_results: usize,
        random_k: usize,
        rng: &mut impl Rng,
    ) -> Vec<Paper> {
        let body = match self.fetch_feed(query, max_results).await {
            Ok(body) => body,
            Err(error) => {
                log::error!("Failed to fetch papers for '{query}': {error}");
                return Vec::new();
            }
        };

        match sample_feed(&body, random_k, rng) {
            Ok(papers) => papers,
            Err(error) => {
                log::error!("Failed to parse paper feed for '{query}': {error}");
                Vec::new()
            }
        }
    }

    async fn fetch_feed(&self, query: &str, max_results: usize) -> Result<String> {
        let body = self
            .client
            .get(&self.config.endpoints.arxiv)
            .query(&[
                ("search_query", format!("all:{query}")),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Parse the feed and sample `k` entries without replacement.
///
/// The feed is Atom, but it goes through the lenient HTML parser: tag soup
/// in abstracts never breaks the parse, and `<entry>` elements select fine
/// as generic markup.
fn sample_feed(body: &str, k: usize, rng: &mut impl Rng) -> Result<Vec<Paper>> {
    let document = Html::parse_document(body);
    let entry_sel = parse_selector("entry")?;
    let title_sel = parse_selector("title")?;
    let summary_sel = parse_selector("summary")?;
    let published_sel = parse_selector("published")?;
    let pdf_sel = parse_selector("link[title=\"pdf\"]")?;

    let entries: Vec<ElementRef> = document.select(&entry_sel).collect();
    if entries.is_empty() {
        log::warn!("No entries found in paper feed.");
        return Ok(Vec::new());
    }

    let mut k = k;
    if k > entries.len() {
        log::warn!(
            "Requested {k} papers but the feed returned {}; keeping all of them.",
            entries.len()
        );
        k = entries.len();
    }

    let mut papers = Vec::with_capacity(k);
    for entry in entries.choose_multiple(rng, k) {
        let mut paper = Paper::new(
            entry_text(entry, &title_sel, "title")?,
            entry_text(entry, &summary_sel, "summary")?,
            entry_text(entry, &published_sel, "published")?,
        );
        paper.pdf_link = entry
            .select(&pdf_sel)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(str::to_string);
        papers.push(paper);
    }
    Ok(papers)
}

fn entry_text(entry: &ElementRef, selector: &Selector, what: &str) -> Result<String> {
    entry
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .ok_or_else(|| AppError::fetch("paper feed", format!("entry missing <{what}>")))
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
