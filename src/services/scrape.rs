// src/services/scrape.rs

//! Page-scraping content sources.
//!
//! The dictionary word-of-the-day and the poem-of-the-day have no JSON API,
//! so these fetchers pull the public page and read a few fixed elements out
//! of it. A selector that matches nothing is a fetch failure like any other:
//! logged, and the section is dropped from the digest.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, Result};
use crate::models::{Config, Poem, WordOfTheDay};

/// Browser-like User-Agent; both pages turn away obvious bot agents.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const WOD_TIMEOUT_SECS: u64 = 10;
const POEM_TIMEOUT_SECS: u64 = 15;

const WOD_WORD: &str = ".otd-item-headword .otd-item-headword__word h1";
const WOD_POS: &str = ".otd-item-headword .otd-item-headword__pos span.italic";
const WOD_POS_PARAGRAPHS: &str = ".otd-item-headword .otd-item-headword__pos p";

const POEM_TITLE: &str = "h4.type-gamma";
const POEM_AUTHOR: &str = "div.type-kappa span span";
const POEM_BODY: &str = "div.rich-text[class*=\"md:text-xl\"]";

/// Fetches the scraped digest sections.
pub struct PageScraper {
    config: Arc<Config>,
    client: Client,
}

impl PageScraper {
    /// Create a new scraper sharing the given HTTP client.
    pub fn new(config: Arc<Config>, client: Client) -> Self {
        Self { config, client }
    }

    /// Fetch and parse the word of the day.
    pub async fn word_of_the_day(&self) -> Option<WordOfTheDay> {
        let url = self.config.endpoints.word_of_the_day.clone();
        match self.fetch_word_of_the_day(&url).await {
            Ok(wod) => Some(wod),
            Err(error) => {
                log::error!("Failed to fetch word of the day: {error}");
                None
            }
        }
    }

    /// Fetch and parse the poem of the day.
    pub async fn poem_of_the_day(&self) -> Option<Poem> {
        let url = self.config.endpoints.poem.clone();
        match self.fetch_poem(&url).await {
            Ok(poem) => Some(poem),
            Err(error) => {
                log::error!("Failed to fetch poem of the day: {error}");
                None
            }
        }
    }

    async fn fetch_word_of_the_day(&self, url: &str) -> Result<WordOfTheDay> {
        let body = self.fetch_page(url, WOD_TIMEOUT_SECS).await?;
        let document = Html::parse_document(&body);
        parse_word_of_the_day(&document)
    }

    async fn fetch_poem(&self, url: &str) -> Result<Poem> {
        let body = self.fetch_page(url, POEM_TIMEOUT_SECS).await?;
        let document = Html::parse_document(&body);
        parse_poem(&document)
    }

    async fn fetch_page(&self, url: &str, timeout_secs: u64) -> Result<String> {
        let body = self
            .client
            .get(url)
            .header(header::USER_AGENT, BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

fn parse_word_of_the_day(document: &Html) -> Result<WordOfTheDay> {
    let word = select_text(document, WOD_WORD, "word of the day")?;
    let part_of_speech = select_text(document, WOD_POS, "word of the day")?;

    // The definition sits in the second paragraph of the headword block.
    let paragraphs = parse_selector(WOD_POS_PARAGRAPHS)?;
    let definition = document
        .select(&paragraphs)
        .nth(1)
        .map(|el| element_text(&el))
        .ok_or_else(|| {
            AppError::fetch(
                "word of the day",
                format!("selector '{WOD_POS_PARAGRAPHS}' has no second paragraph"),
            )
        })?;

    Ok(WordOfTheDay {
        word,
        part_of_speech,
        definition,
    })
}

fn parse_poem(document: &Html) -> Result<Poem> {
    let title = select_text(document, POEM_TITLE, "poem of the day")?;

    let author_sel = parse_selector(POEM_AUTHOR)?;
    let author = document
        .select(&author_sel)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_else(|| "Unknown".to_string());

    let body_sel = parse_selector(POEM_BODY)?;
    let body = document.select(&body_sel).next().ok_or_else(|| {
        AppError::fetch(
            "poem of the day",
            format!("selector '{POEM_BODY}' matched nothing"),
        )
    })?;

    Ok(Poem {
        title,
        author,
        poem: text_with_breaks(&body),
    })
}

/// Select the first match and return its stripped text.
fn select_text(document: &Html, selector: &str, source: &str) -> Result<String> {
    let parsed = parse_selector(selector)?;
    document
        .select(&parsed)
        .next()
        .map(|el| element_text(&el))
        .ok_or_else(|| AppError::fetch(source, format!("selector '{selector}' matched nothing")))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Collect text, turning `<br>` elements into newlines to keep verse lines.
fn text_with_breaks(element: &ElementRef) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        match node.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WOD_PAGE: &str = r#"
        <html><body>
          <div class="otd-item-headword">
            <div class="otd-item-headword__word"><h1> matutinal </h1></div>
            <div class="otd-item-headword__pos">
              <p><span class="italic">adjective</span></p>
              <p>pertaining to or occurring in the morning.</p>
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn word_of_the_day_reads_headword_block() {
        let document = Html::parse_document(WOD_PAGE);
        let wod = parse_word_of_the_day(&document).unwrap();
        assert_eq!(wod.word, "matutinal");
        assert_eq!(wod.part_of_speech, "adjective");
        assert_eq!(wod.definition, "pertaining to or occurring in the morning.");
    }

    #[test]
    fn word_of_the_day_requires_second_paragraph() {
        let page = r#"
            <div class="otd-item-headword">
              <div class="otd-item-headword__word"><h1>word</h1></div>
              <div class="otd-item-headword__pos">
                <p><span class="italic">noun</span></p>
              </div>
            </div>
        "#;
        let document = Html::parse_document(page);
        assert!(parse_word_of_the_day(&document).is_err());
    }

    #[test]
    fn poem_preserves_line_breaks() {
        let page = r#"
            <html><body>
              <h4 class="type-gamma">The Lake Isle</h4>
              <div class="type-kappa"><span>By <span>W. B. Yeats</span></span></div>
              <div class="rich-text text-base md:text-xl">I will arise and go now,<br>and go to Innisfree</div>
            </body></html>
        "#;
        let document = Html::parse_document(page);
        let poem = parse_poem(&document).unwrap();
        assert_eq!(poem.title, "The Lake Isle");
        assert_eq!(poem.author, "W. B. Yeats");
        assert_eq!(poem.poem, "I will arise and go now,\nand go to Innisfree");
    }

    #[test]
    fn poem_author_defaults_to_unknown() {
        let page = r#"
            <h4 class="type-gamma">Untitled</h4>
            <div class="rich-text md:text-xl">A single line</div>
        "#;
        let document = Html::parse_document(page);
        let poem = parse_poem(&document).unwrap();
        assert_eq!(poem.author, "Unknown");
    }

    #[test]
    fn poem_without_body_is_an_error() {
        let document = Html::parse_document("<h4 class=\"type-gamma\">Title only</h4>");
        assert!(parse_poem(&document).is_err());
    }
}
