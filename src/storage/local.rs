//! Local filesystem PDF storage.

use std::path::PathBuf;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::storage::{PdfStore, StoredPdf};

/// Stores PDFs under a root directory on the local filesystem.
#[derive(Clone)]
pub struct LocalPdfStore {
    root_dir: PathBuf,
}

impl LocalPdfStore {
    /// Create a store rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    fn path(&self, dir_slug: &str, file_name: &str) -> PathBuf {
        self.root_dir.join(dir_slug).join(file_name)
    }
}

#[async_trait]
impl PdfStore for LocalPdfStore {
    /// Stream the body to a temporary file, then rename into place.
    async fn store(
        &self,
        dir_slug: &str,
        file_name: &str,
        response: reqwest::Response,
    ) -> Result<StoredPdf> {
        let path = self.path(dir_slug, file_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        log::info!("Saved {}", path.display());
        Ok(StoredPdf::Local(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncWriteExt as _;
    use tokio::net::TcpListener;

    /// Serve one canned PDF response on an ephemeral port.
    async fn serve_pdf(body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let header = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/pdf\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                body.len()
            );
            socket.write_all(header.as_bytes()).await.unwrap();
            socket.write_all(body).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/paper.pdf")
    }

    #[tokio::test]
    async fn streams_body_to_final_path() {
        let tmp = TempDir::new().unwrap();
        let store = LocalPdfStore::new(tmp.path());
        let url = serve_pdf(b"%PDF-1.5 fake body").await;

        let response = reqwest::get(&url).await.unwrap();
        let stored = store
            .store("large_language_models", "attention.pdf", response)
            .await
            .unwrap();

        let StoredPdf::Local(path) = stored else {
            panic!("expected a local path");
        };
        assert_eq!(
            path,
            tmp.path().join("large_language_models").join("attention.pdf")
        );
        let bytes = tokio::fs::read(&path).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.5 fake body");
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn creates_missing_query_directory() {
        let tmp = TempDir::new().unwrap();
        let store = LocalPdfStore::new(tmp.path().join("nested").join("storage"));
        let url = serve_pdf(b"pdf").await;

        let response = reqwest::get(&url).await.unwrap();
        store.store("query", "a.pdf", response).await.unwrap();

        assert!(
            tmp.path()
                .join("nested")
                .join("storage")
                .join("query")
                .join("a.pdf")
                .exists()
        );
    }
}
