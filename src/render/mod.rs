// src/render/mod.rs

//! Digest rendering.
//!
//! Both renderings walk the same context; sections whose source failed
//! are skipped entirely rather than shown empty.

use askama::Template;

use crate::error::Result;
use crate::mail::{EmailBody, EmailFormat};
use crate::models::DigestContext;

/// HTML rendering of the digest.
#[derive(Template)]
#[template(path = "newsletter.html")]
struct HtmlDigest<'a> {
    ctx: &'a DigestContext,
}

/// Plain-text rendering of the digest.
#[derive(Template)]
#[template(path = "newsletter.txt")]
struct TextDigest<'a> {
    ctx: &'a DigestContext,
}

/// Render the digest body in the requested format.
///
/// The HTML format always carries a plain-text alternative for clients
/// that prefer one.
pub fn render_body(ctx: &DigestContext, format: EmailFormat) -> Result<EmailBody> {
    let text = TextDigest { ctx }.render()?;
    match format {
        EmailFormat::Plain => Ok(EmailBody::Plain(text)),
        EmailFormat::Html => {
            let html = HtmlDigest { ctx }.render()?;
            Ok(EmailBody::Html { html, text })
        }
    }
}

/// Expand `{name}` in the configured subject template.
pub fn render_subject(template: &str, name: &str) -> String {
    template.replace("{name}", name)
}
