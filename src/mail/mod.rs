//! Email assembly and delivery.

pub mod gmail;
pub mod oauth;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use gmail::GmailMailer;
pub use oauth::{GmailAuth, TokenCacheStatus, inspect_credentials};

/// How digest bodies are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmailFormat {
    #[default]
    Html,
    Plain,
}

impl EmailFormat {
    /// Parse a configured format name, falling back to plain text.
    pub fn parse_or_plain(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "html" => Self::Html,
            "plain" => Self::Plain,
            other => {
                log::warn!("Invalid email format '{other}', sending plain text.");
                Self::Plain
            }
        }
    }
}

/// Rendered body of an outgoing digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailBody {
    /// Plain text only.
    Plain(String),
    /// HTML with a plain-text alternative for clients that want one.
    Html { html: String, text: String },
}

/// One outgoing message.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: EmailBody,
    /// PDF attachments as (file name, bytes).
    pub attachments: Vec<(String, Vec<u8>)>,
}

/// Async email sending trait.
///
/// Implement this to provide alternative delivery backends.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send one email, returning the provider's message id.
    async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}
