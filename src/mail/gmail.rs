// src/mail/gmail.rs

//! Gmail API delivery.
//!
//! Builds the RFC 5322 message with lettre, then submits it Base64-encoded
//! to the `messages/send` endpoint with a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::mail::oauth::GmailAuth;
use crate::mail::{EmailBody, Mailer, OutgoingEmail};

const SEND_TIMEOUT_SECS: u64 = 30;

/// Sends digests through the Gmail API on behalf of the sender.
pub struct GmailMailer {
    client: Client,
    auth: GmailAuth,
    endpoint: String,
    sender: Mailbox,
}

impl GmailMailer {
    pub fn new(
        client: Client,
        auth: GmailAuth,
        endpoint: impl Into<String>,
        sender: &str,
    ) -> Result<Self> {
        let sender = sender
            .parse()
            .map_err(|_| AppError::mail(format!("invalid sender address '{sender}'")))?;
        Ok(Self {
            client,
            auth,
            endpoint: endpoint.into(),
            sender,
        })
    }

    /// Force token acquisition up front so an unusable credential setup
    /// fails before any content is fetched.
    pub async fn authorize(&self) -> Result<()> {
        self.auth.access_token().await?;
        Ok(())
    }
}

#[async_trait]
impl Mailer for GmailMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String> {
        let message = build_message(&self.sender, email)?;
        let raw = URL_SAFE.encode(message.formatted());

        let token = self.auth.access_token().await?;
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&SendRequest { raw })
            .timeout(Duration::from_secs(SEND_TIMEOUT_SECS))
            .send()
            .await?
            .error_for_status()?;

        let sent: SendResponse = response.json().await.unwrap_or_default();
        Ok(sent.id.unwrap_or_default())
    }
}

/// Assemble the MIME message: plain or HTML-with-alternative body, plus
/// one `application/pdf` part per attachment.
fn build_message(sender: &Mailbox, email: &OutgoingEmail) -> Result<Message> {
    let to: Mailbox = email
        .to
        .parse()
        .map_err(|_| AppError::mail(format!("invalid recipient address '{}'", email.to)))?;

    let builder = Message::builder()
        .from(sender.clone())
        .to(to)
        .subject(&email.subject);

    if email.attachments.is_empty() {
        return match &email.body {
            EmailBody::Plain(text) => builder.body(text.clone()),
            EmailBody::Html { html, text } => {
                builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))
            }
        }
        .map_err(|e| AppError::mail(e.to_string()));
    }

    let mut mixed = match &email.body {
        EmailBody::Plain(text) => MultiPart::mixed().singlepart(SinglePart::plain(text.clone())),
        EmailBody::Html { html, text } => MultiPart::mixed()
            .multipart(MultiPart::alternative_plain_html(text.clone(), html.clone())),
    };
    for (file_name, bytes) in &email.attachments {
        mixed = mixed.singlepart(pdf_attachment(file_name, bytes.clone())?);
    }
    builder
        .multipart(mixed)
        .map_err(|e| AppError::mail(e.to_string()))
}

fn pdf_attachment(file_name: &str, bytes: Vec<u8>) -> Result<SinglePart> {
    let content_type =
        ContentType::parse("application/pdf").map_err(|e| AppError::mail(e.to_string()))?;
    Ok(Attachment::new(file_name.to_string()).body(bytes, content_type))
}

#[derive(Serialize)]
struct SendRequest {
    raw: String,
}

#[derive(Deserialize, Default)]
struct SendResponse {
    #[serde(default)]
    id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::models::AuthConfig;

    fn sender() -> Mailbox {
        "Digest <digest@example.com>".parse().unwrap()
    }

    /// Accept one request, reply with a message id, and hand the raw
    /// request back for inspection.
    async fn serve_send_endpoint() -> (String, tokio::sync::oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buffer = [0u8; 4096];
            loop {
                let n = socket.read(&mut buffer).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buffer[..n]);
                if request_is_complete(&request) {
                    break;
                }
            }
            let body = r#"{"id": "msg-1"}"#;
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
        });
        (format!("http://{addr}/send"), rx)
    }

    fn request_is_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(split) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..split]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        text.len() - split - 4 >= content_length
    }

    #[tokio::test]
    async fn send_posts_the_encoded_message_with_a_bearer_token() {
        let tmp = TempDir::new().unwrap();
        let credentials = tmp.path().join("credentials.json");
        tokio::fs::write(
            &credentials,
            br#"{"installed": {"client_id": "id", "client_secret": "secret"}}"#,
        )
        .await
        .unwrap();
        let token = tmp.path().join("token.json");
        tokio::fs::write(
            &token,
            br#"{"access_token": "cached-token", "expiry": "2099-01-01T00:00:00Z"}"#,
        )
        .await
        .unwrap();

        let (endpoint, captured) = serve_send_endpoint().await;
        let auth = GmailAuth::from_config(&AuthConfig {
            credentials_path: credentials,
            token_path: token,
        })
        .await
        .unwrap();
        let mailer =
            GmailMailer::new(reqwest::Client::new(), auth, endpoint, "digest@example.com").unwrap();

        let email = OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "Good Morning, Alice!".to_string(),
            body: EmailBody::Plain("hello".to_string()),
            attachments: Vec::new(),
        };
        let id = mailer.send(&email).await.unwrap();
        assert_eq!(id, "msg-1");

        let request = captured.await.unwrap();
        assert!(request.to_lowercase().contains("authorization: bearer cached-token"));

        let body_start = request.find("\r\n\r\n").unwrap() + 4;
        let send: serde_json::Value = serde_json::from_str(&request[body_start..]).unwrap();
        let decoded = URL_SAFE.decode(send["raw"].as_str().unwrap()).unwrap();
        let message = String::from_utf8(decoded).unwrap();
        assert!(message.contains("Subject: Good Morning, Alice!"));
        assert!(message.contains("To: alice@example.com"));
        assert!(message.contains("hello"));
    }

    #[test]
    fn plain_message_without_attachments_is_single_part() {
        let email = OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "Good Morning, Alice!".to_string(),
            body: EmailBody::Plain("hello".to_string()),
            attachments: Vec::new(),
        };

        let message = build_message(&sender(), &email).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: Good Morning, Alice!"));
        assert!(formatted.contains("hello"));
        assert!(!formatted.contains("multipart/mixed"));
    }

    #[test]
    fn html_message_carries_a_plain_alternative() {
        let email = OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "s".to_string(),
            body: EmailBody::Html {
                html: "<h1>Digest</h1>".to_string(),
                text: "Digest".to_string(),
            },
            attachments: Vec::new(),
        };

        let message = build_message(&sender(), &email).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("text/plain"));
        assert!(formatted.contains("text/html"));
    }

    #[test]
    fn attachments_wrap_the_body_in_multipart_mixed() {
        let email = OutgoingEmail {
            to: "alice@example.com".to_string(),
            subject: "s".to_string(),
            body: EmailBody::Plain("see attached".to_string()),
            attachments: vec![("paper.pdf".to_string(), b"%PDF-1.5".to_vec())],
        };

        let message = build_message(&sender(), &email).unwrap();
        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("multipart/mixed"));
        assert!(formatted.contains("application/pdf"));
        assert!(formatted.contains("paper.pdf"));
    }

    #[test]
    fn invalid_recipient_is_an_error() {
        let email = OutgoingEmail {
            to: "not an address".to_string(),
            subject: "s".to_string(),
            body: EmailBody::Plain("x".to_string()),
            attachments: Vec::new(),
        };
        assert!(build_message(&sender(), &email).is_err());
    }
}
