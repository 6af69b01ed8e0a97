//! Error taxonomy shared by the archiver, publisher and fetcher.
//!
//! The crate performs no retries and no silent recovery: any failure in a
//! collaborator call surfaces immediately as the matching variant. The one
//! recovered case, a build with no content supplied, is not an error at all
//! but [`crate::archive::BuildOutcome::Empty`].

use std::path::PathBuf;

/// All failure modes of the documentation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DocsError {
    /// A required input field was missing or empty.
    #[error("missing required field: {0}")]
    Input(&'static str),

    /// The docs folder was given but could not be read.
    #[error("failed to read docs tree at {path}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema or reference value could not be serialised to JSON.
    #[error("failed to serialise archive entry {entry}")]
    Serialization {
        entry: String,
        #[source]
        source: serde_json::Error,
    },

    /// Writing the tar or gzip stream failed.
    #[error("failed to assemble archive")]
    Archive(#[source] std::io::Error),

    /// Credentials were absent or rejected by the bucket.
    #[error("bucket rejected credentials: {0}")]
    Auth(String),

    /// Transport failure while writing to the bucket.
    #[error("upload to bucket failed: {0}")]
    Upload(String),

    /// Transport failure while reading from the bucket.
    #[error("download from bucket failed: {0}")]
    Download(String),

    /// No artifact has been published under the requested key.
    #[error("no artifact published at {key}")]
    NotFound { key: String },
}
