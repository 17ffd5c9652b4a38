//! Storage backends for downloaded paper PDFs.
//!
//! Each run stores the sampled papers under a per-query directory:
//!
//! ```text
//! {storage_dir}/
//! └── large_language_models/
//!     ├── attention_is_all_you_need.pdf
//!     └── scaling_laws_for_neural_language_models.pdf
//! ```
//!
//! The S3 backend mirrors the same layout as object keys in the bucket.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Config, StorageMode};

// Re-export for convenience
pub use local::LocalPdfStore;
#[cfg(feature = "s3")]
pub use s3::S3PdfStore;

/// Where a stored PDF ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredPdf {
    /// Path on the local filesystem.
    Local(PathBuf),
    /// Object key in the configured bucket.
    S3(String),
}

/// Trait for PDF storage backends.
#[async_trait]
pub trait PdfStore: Send + Sync {
    /// Persist the body of `response` as `{dir_slug}/{file_name}`.
    async fn store(
        &self,
        dir_slug: &str,
        file_name: &str,
        response: reqwest::Response,
    ) -> Result<StoredPdf>;
}

/// Build the storage backend selected by the configuration.
pub async fn create_store(config: &Config) -> Result<Box<dyn PdfStore>> {
    match config.arxiv.storage_type {
        StorageMode::Local => Ok(Box::new(LocalPdfStore::new(&config.arxiv.storage_dir))),
        #[cfg(feature = "s3")]
        StorageMode::S3 => Ok(Box::new(S3PdfStore::from_config(&config.s3).await?)),
        #[cfg(not(feature = "s3"))]
        StorageMode::S3 => Err(crate::error::AppError::config(
            "storage_type = \"s3\" requires a build with the 's3' feature",
        )),
    }
}
