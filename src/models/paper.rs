//! Academic paper record.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A paper sampled from the search feed.
///
/// `local_path` and `s3_path` start unset and are backfilled by PDF
/// acquisition; at most one of them is ever set, depending on the configured
/// storage mode. A failed download leaves both unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paper {
    /// Paper title
    pub title: String,

    /// Abstract text
    #[serde(rename = "abstract")]
    pub abstract_text: String,

    /// Publication timestamp as given by the feed
    pub published: String,

    /// Link to the PDF rendition, absent when the feed offers none
    pub pdf_link: Option<String>,

    /// Path of the downloaded PDF on the local filesystem
    pub local_path: Option<PathBuf>,

    /// Object key of the uploaded PDF in the bucket
    pub s3_path: Option<String>,
}

impl Paper {
    pub fn new(
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        published: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            published: published.into(),
            pdf_link: None,
            local_path: None,
            s3_path: None,
        }
    }
}
