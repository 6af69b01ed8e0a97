#![doc = "docs-bucket: core logic for packaging and publishing service documentation."]

//! This crate assembles a service's documentation artifacts (a free-form
//! docs tree, validated JSON schemas and generated API/event references)
//! into a single gzip-compressed tar archive, and moves that archive to and
//! from an object-storage bucket under a project-scoped key.
//!
//! # Usage
//! Build an archive with [`archive::build`], or run the whole pipeline
//! (build, then optionally publish) with [`publish::document`]. Retrieve a
//! previously published artifact as a byte stream with [`publish::fetch`].
//! Storage access goes through the [`contract::ObjectStore`] trait;
//! [`store::BucketClient`] is the HTTP implementation.

pub mod archive;
pub mod contract;
pub mod error;
pub mod publish;
pub mod store;

pub use archive::{build, Archive, ArchiveInput, BuildOutcome, Metadata, Reference};
pub use contract::{ByteStream, ObjectStore};
pub use error::DocsError;
pub use publish::{document, fetch, storage_key, PublishReceipt};
pub use store::BucketClient;
