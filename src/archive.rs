//! Archive assembly: turns a sparse set of documentation inputs into a
//! gzip-compressed tar stream.
//!
//! The entry set is a pure function of which inputs are present:
//!   - a docs tree is copied under `docs/` with relative paths preserved
//!   - schemas land under `schemas/<name>.json`, references under
//!     `references/<name>.json`, both as indented JSON
//!   - projects with schemas or references but no docs tree get two fixed
//!     boilerplate documents in place of `docs/`
//!   - `metadata.json` and a generated `README.md` are always present
//!
//! Supplying none of the content inputs is not an error: the build returns
//! [`BuildOutcome::Empty`], a first-class "nothing to publish" state.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tar::Header;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::DocsError;

const DOCUMENTING_NON_SERVICES: &str = include_str!("../static/documenting-non-services.md");
const FORMAT: &str = include_str!("../static/format.md");

/// A named, generated reference document (API or event interface).
///
/// The `reference` value is opaque to this crate: it comes from an external
/// generator already serialised to JSON terms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
    pub reference: serde_json::Value,
}

/// Per-build input. `tier` is the only required field; every content-bearing
/// field is independently optional.
#[derive(Debug, Clone, Default)]
pub struct ArchiveInput {
    /// Classification label (e.g. "core") recorded in the archive metadata.
    pub tier: String,
    /// Root of a documentation tree to copy under `docs/`.
    pub docs_folder: Option<PathBuf>,
    /// Validated schemas, keyed by name, as opaque JSON values.
    pub schemas: Option<BTreeMap<String, serde_json::Value>>,
    /// Ordered API/event reference documents.
    pub references: Option<Vec<Reference>>,
    /// Project name; required only when publishing or fetching.
    pub project: Option<String>,
    /// When true the built archive is also uploaded by [`crate::publish::document`].
    pub publish: bool,
    /// Extra caller-supplied descriptive fields, flattened into `metadata.json`.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ArchiveInput {
    /// Whether any doc-producing input was supplied at all.
    pub fn has_content(&self) -> bool {
        self.docs_folder.is_some() || self.schemas.is_some() || self.references.is_some()
    }

    fn to_metadata(&self) -> Metadata {
        Metadata {
            project: self.project.clone(),
            tier: self.tier.clone(),
            extra: self.metadata.clone(),
        }
    }
}

/// The descriptive record embedded as `metadata.json` in every archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub tier: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A finished, fully terminated tar+gzip byte stream.
#[derive(Debug, Clone)]
pub struct Archive {
    bytes: Bytes,
}

impl Archive {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Cheap handle on the underlying buffer (no copy).
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Tagged build result: either a finished archive or the explicit
/// "valid, nothing to ship" state.
#[derive(Debug, Clone)]
pub enum BuildOutcome {
    Archive(Archive),
    Empty,
}

impl BuildOutcome {
    pub fn archive(&self) -> Option<&Archive> {
        match self {
            BuildOutcome::Archive(archive) => Some(archive),
            BuildOutcome::Empty => None,
        }
    }

    pub fn into_archive(self) -> Option<Archive> {
        match self {
            BuildOutcome::Archive(archive) => Some(archive),
            BuildOutcome::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, BuildOutcome::Empty)
    }
}

/// Build the documentation archive for `input`.
///
/// Returns [`BuildOutcome::Empty`] when none of the content inputs
/// (docs folder, schemas, references) is present.
pub fn build(input: &ArchiveInput) -> Result<BuildOutcome, DocsError> {
    if input.tier.trim().is_empty() {
        return Err(DocsError::Input("tier"));
    }

    if !input.has_content() {
        info!(tier = %input.tier, "[BUILD] No content inputs supplied, nothing to archive");
        return Ok(BuildOutcome::Empty);
    }

    let metadata = input.to_metadata();
    let mut writer = EntryWriter::new();
    let mut entries = 0usize;

    if let Some(root) = &input.docs_folder {
        entries += append_docs_tree(&mut writer, root)?;
    } else {
        // Schemas or references without prose docs: ship the boilerplate
        // explaining where the real content lives.
        writer.append("docs/documenting-non-services.md", DOCUMENTING_NON_SERVICES.as_bytes())?;
        writer.append("docs/format.md", FORMAT.as_bytes())?;
        entries += 2;
    }

    if let Some(schemas) = &input.schemas {
        for (name, schema) in schemas {
            let entry = format!("schemas/{name}.json");
            let body = serde_json::to_vec_pretty(schema).map_err(|e| {
                DocsError::Serialization {
                    entry: entry.clone(),
                    source: e,
                }
            })?;
            writer.append(&entry, &body)?;
            entries += 1;
        }
    }

    if let Some(references) = &input.references {
        for reference in references {
            let entry = format!("references/{}.json", reference.name);
            let body = serde_json::to_vec_pretty(&reference.reference).map_err(|e| {
                DocsError::Serialization {
                    entry: entry.clone(),
                    source: e,
                }
            })?;
            writer.append(&entry, &body)?;
            entries += 1;
        }
    }

    let metadata_json = serde_json::to_vec_pretty(&metadata).map_err(|e| {
        DocsError::Serialization {
            entry: "metadata.json".to_string(),
            source: e,
        }
    })?;
    writer.append("metadata.json", &metadata_json)?;
    writer.append("README.md", readme(&metadata).as_bytes())?;
    entries += 2;

    let bytes = writer.finish()?;
    info!(
        entries,
        compressed_bytes = bytes.len(),
        tier = %input.tier,
        "[BUILD] Archive assembled"
    );
    Ok(BuildOutcome::Archive(Archive { bytes }))
}

/// Copy every file under `root` into the archive at `docs/<relative path>`.
/// Returns the number of entries written.
fn append_docs_tree(writer: &mut EntryWriter, root: &Path) -> Result<usize, DocsError> {
    let meta = fs::metadata(root).map_err(|e| DocsError::Filesystem {
        path: root.to_path_buf(),
        source: e,
    })?;
    if !meta.is_dir() {
        return Err(DocsError::Filesystem {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, "docs folder is not a directory"),
        });
    }

    let mut entries = 0usize;
    // Sorted walk keeps the entry order stable between builds of the same tree.
    for item in WalkDir::new(root).sort_by_file_name() {
        let item = item.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            DocsError::Filesystem {
                path,
                source: e
                    .into_io_error()
                    .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "walk failed")),
            }
        })?;
        if !item.file_type().is_file() {
            continue;
        }
        let rel = item
            .path()
            .strip_prefix(root)
            .expect("walkdir yields paths under its root");
        let name = format!("docs/{}", posix_path(rel));
        let body = fs::read(item.path()).map_err(|e| DocsError::Filesystem {
            path: item.path().to_path_buf(),
            source: e,
        })?;
        debug!(entry = %name, bytes = body.len(), "[BUILD] Adding docs file");
        writer.append(&name, &body)?;
        entries += 1;
    }
    Ok(entries)
}

/// Tar entry names are POSIX-style regardless of the host separator.
fn posix_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn readme(metadata: &Metadata) -> String {
    let project = metadata.project.as_deref().unwrap_or("this project");
    format!(
        "# Documentation archive for {project}\n\n\
         Tier: {tier}\n\n\
         This archive was generated from the documentation, schemas and\n\
         references supplied by {project} at publish time. See `docs/format.md`\n\
         inside the archive, or `metadata.json`, for the full layout.\n",
        project = project,
        tier = metadata.tier,
    )
}

/// Tar-over-gzip writer with normalized headers, so identical inputs yield
/// identical bytes.
struct EntryWriter {
    builder: tar::Builder<GzEncoder<Vec<u8>>>,
}

impl EntryWriter {
    fn new() -> Self {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        Self {
            builder: tar::Builder::new(encoder),
        }
    }

    fn append(&mut self, name: &str, data: &[u8]) -> Result<(), DocsError> {
        let mut header = Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_mode(0o644);
        self.builder
            .append_data(&mut header, name, data)
            .map_err(DocsError::Archive)
    }

    /// Terminate the tar stream and flush the gzip trailer. The returned
    /// buffer is a complete, decodable artifact.
    fn finish(self) -> Result<Bytes, DocsError> {
        let encoder = self.builder.into_inner().map_err(DocsError::Archive)?;
        let bytes = encoder.finish().map_err(DocsError::Archive)?;
        Ok(Bytes::from(bytes))
    }
}
