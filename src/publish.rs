//! Publish and fetch: moves finished archives to and from durable storage
//! under a project-scoped key.
//!
//! Both directions resolve the same deterministic key, so the most recent
//! publish for a project is always the artifact a fetch returns. Two
//! concurrent publishes for the *same* project race with last-write-wins
//! semantics; callers needing stronger ordering must serialise externally.
//!
//! The top-level [`document`] pipeline chains a build with an optional
//! publish, skipping the upload entirely when the build produced nothing.

use tracing::{debug, error, info};

use crate::archive::{self, Archive, ArchiveInput, BuildOutcome};
use crate::contract::{ByteStream, ObjectStore};
use crate::error::DocsError;

/// Bucket key for a project's documentation artifact.
///
/// A single key per project: each publish overwrites the previous artifact.
pub fn storage_key(project: &str) -> String {
    format!("{project}/latest.tar.gz")
}

/// Confirmation of a completed publish, for downstream audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub project: String,
    pub key: String,
    pub bytes: usize,
}

/// Upload `archive` to the bucket under the key derived from `project`.
///
/// Exactly one write, no internal retries. Overwrites whatever was last
/// published for the project.
pub async fn publish<S>(
    store: &S,
    archive: &Archive,
    project: &str,
) -> Result<PublishReceipt, DocsError>
where
    S: ObjectStore,
{
    if project.trim().is_empty() {
        return Err(DocsError::Input("project"));
    }

    let key = storage_key(project);
    info!(project, key = %key, bytes = archive.len(), "[PUBLISH] Uploading archive");
    if let Err(e) = store.put(&key, archive.bytes()).await {
        error!(project, key = %key, error = %e, "[PUBLISH][ERROR] Upload failed");
        return Err(e);
    }
    info!(project, key = %key, "[PUBLISH] Archive stored");
    Ok(PublishReceipt {
        project: project.to_string(),
        key,
        bytes: archive.len(),
    })
}

/// Open a streaming read of the last published artifact for `project`.
///
/// The returned stream is the raw tar+gzip encoding; it is not buffered or
/// decoded here. A fully consumed stream always decodes to an archive with
/// at least a `metadata.json` entry, since no publish ever writes one
/// without it.
pub async fn fetch<S>(store: &S, project: &str) -> Result<ByteStream, DocsError>
where
    S: ObjectStore,
{
    if project.trim().is_empty() {
        return Err(DocsError::Input("project"));
    }

    let key = storage_key(project);
    info!(project, key = %key, "[FETCH] Opening artifact stream");
    store.get(&key).await
}

/// Build the archive for `input` and, when requested and possible, publish it.
///
/// The publish step runs only when `input.publish` is set, a store is
/// supplied, and the build actually produced an archive; an empty outcome is
/// skipped silently with no network call. The outcome is returned either way
/// so the caller owns the artifact.
pub async fn document<S>(
    input: &ArchiveInput,
    store: Option<&S>,
) -> Result<BuildOutcome, DocsError>
where
    S: ObjectStore,
{
    let outcome = archive::build(input)?;

    if input.publish {
        match (&outcome, store) {
            (BuildOutcome::Empty, _) => {
                info!("[PUBLISH] Nothing was built, skipping publish");
            }
            (BuildOutcome::Archive(_), None) => {
                debug!("[PUBLISH] Publish requested but no store supplied, skipping");
            }
            (BuildOutcome::Archive(archive), Some(store)) => {
                let project = input.project.as_deref().ok_or(DocsError::Input("project"))?;
                publish(store, archive, project).await?;
            }
        }
    }

    Ok(outcome)
}
