//! AWS S3 PDF storage.
//!
//! Credentials come from the default AWS provider chain; the configured
//! region, when set, overrides the chain's choice.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;

use crate::error::{AppError, Result};
use crate::models::S3Config;
use crate::storage::{PdfStore, StoredPdf};

/// Uploads PDFs to an S3 bucket, keyed `{dir_slug}/{file_name}`.
pub struct S3PdfStore {
    client: Client,
    bucket: String,
}

impl S3PdfStore {
    /// Create a store for an existing client and bucket.
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Create a store from the bucket configuration and the ambient
    /// AWS environment.
    pub async fn from_config(config: &S3Config) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;
        Ok(Self::new(Client::new(&sdk_config), &config.bucket))
    }
}

#[async_trait]
impl PdfStore for S3PdfStore {
    /// Buffer the body and upload it in one `PutObject` call.
    async fn store(
        &self,
        dir_slug: &str,
        file_name: &str,
        response: reqwest::Response,
    ) -> Result<StoredPdf> {
        let bytes = response.bytes().await?;
        let key = format!("{}/{}", dir_slug.trim_matches('/'), file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type("application/pdf")
            .send()
            .await
            .map_err(|e| AppError::S3(e.to_string()))?;

        log::info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(StoredPdf::S3(key))
    }
}
