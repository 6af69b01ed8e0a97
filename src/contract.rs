//! # contract: narrow interface to the object-storage collaborator
//!
//! The archiver and publisher only ever talk to durable storage through
//! [`ObjectStore`]: one write, one streaming read, keyed by opaque strings.
//! Authentication, transport and retry policy are entirely the implementor's
//! concern.
//!
//! ## Mocking & testing
//! The trait is annotated for `mockall`, and the generated mock is exported
//! behind the `test-export-mocks` feature (on by default) so integration
//! tests can exercise publish/fetch without a real bucket.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::DocsError;

/// A lazily produced, finite byte stream read from the bucket.
///
/// The stream is the still-encoded artifact (tar+gzip); consuming it fully
/// and decoding yields the archive entries.
pub type ByteStream = BoxStream<'static, Result<Bytes, DocsError>>;

/// Trait for writing and reading artifacts in a bucket namespace.
///
/// Implementors map errors onto the crate taxonomy: credential problems to
/// [`DocsError::Auth`], a missing key to [`DocsError::NotFound`], transport
/// failures to [`DocsError::Upload`]/[`DocsError::Download`]. The trait is
/// implemented by real clients and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `body` at `key`, overwriting any existing object.
    async fn put(&self, key: &str, body: Bytes) -> Result<(), DocsError>;

    /// Open a streaming read of the object at `key`.
    async fn get(&self, key: &str) -> Result<ByteStream, DocsError>;
}
