use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use flate2::read::GzDecoder;
use futures::StreamExt;
use serial_test::serial;

use docs_bucket::contract::MockObjectStore;
use docs_bucket::{
    build, document, fetch, storage_key, ArchiveInput, BucketClient, DocsError, Metadata,
};

fn schemas_input(project: Option<&str>, publish: bool) -> ArchiveInput {
    let mut schemas = BTreeMap::new();
    schemas.insert("foo".to_string(), serde_json::json!({"type": "object"}));
    ArchiveInput {
        tier: "core".to_string(),
        schemas: Some(schemas),
        project: project.map(str::to_string),
        publish,
        ..Default::default()
    }
}

/// Gunzip + untar a fetched byte buffer and return the decoded metadata.json.
fn metadata_in(raw: &[u8]) -> Metadata {
    let mut tar = tar::Archive::new(GzDecoder::new(raw));
    for entry in tar.entries().expect("fetched artifact should be a tar stream") {
        let mut entry = entry.expect("entry should be readable");
        if entry.path().unwrap().to_string_lossy() == "metadata.json" {
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            return serde_json::from_slice(&data).expect("metadata.json should be valid JSON");
        }
    }
    panic!("fetched artifact is missing metadata.json");
}

#[tokio::test]
async fn publish_then_fetch_yields_metadata_with_project() {
    let archive = build(&schemas_input(Some("docs-testing"), false))
        .unwrap()
        .into_archive()
        .unwrap();

    // The mock bucket remembers the last body written per publish.
    let stored: Arc<Mutex<Option<Bytes>>> = Arc::new(Mutex::new(None));
    let mut store = MockObjectStore::new();

    let sink = stored.clone();
    store
        .expect_put()
        .withf(|key, _body| key == "docs-testing/latest.tar.gz")
        .times(1)
        .returning(move |_key, body| {
            *sink.lock().unwrap() = Some(body);
            Ok(())
        });

    let source = stored.clone();
    store
        .expect_get()
        .withf(|key| key == "docs-testing/latest.tar.gz")
        .times(1)
        .returning(move |_key| {
            let body = source
                .lock()
                .unwrap()
                .clone()
                .expect("artifact must be published before fetch");
            // Split into chunks: callers consume a stream, not a buffer.
            let mid = body.len() / 2;
            let chunks = vec![Ok(body.slice(..mid)), Ok(body.slice(mid..))];
            Ok(futures::stream::iter(chunks).boxed())
        });

    let receipt = docs_bucket::publish::publish(&store, &archive, "docs-testing")
        .await
        .expect("publish should succeed");
    assert_eq!(receipt.project, "docs-testing");
    assert_eq!(receipt.key, storage_key("docs-testing"));
    assert_eq!(receipt.bytes, archive.len());

    let mut stream = fetch(&store, "docs-testing")
        .await
        .expect("fetch should succeed");
    let mut raw = Vec::new();
    while let Some(chunk) = stream.next().await {
        raw.extend_from_slice(&chunk.expect("stream chunk should be ok"));
    }
    assert_eq!(raw, archive.as_bytes());

    let metadata = metadata_in(&raw);
    assert_eq!(metadata.project.as_deref(), Some("docs-testing"));
    assert_eq!(metadata.tier, "core");
}

#[tokio::test]
async fn document_builds_and_publishes_when_requested() {
    let mut store = MockObjectStore::new();
    store
        .expect_put()
        .withf(|key, body| key == "docs-testing/latest.tar.gz" && !body.is_empty())
        .times(1)
        .returning(|_key, _body| Ok(()));

    let outcome = document(&schemas_input(Some("docs-testing"), true), Some(&store))
        .await
        .expect("document should succeed");
    assert!(
        outcome.archive().is_some(),
        "the caller still owns the built archive after publishing"
    );
}

#[tokio::test]
async fn second_publish_overwrites_the_first() {
    let first = build(&schemas_input(Some("docs-testing"), false))
        .unwrap()
        .into_archive()
        .unwrap();
    let mut input = schemas_input(Some("docs-testing"), false);
    input
        .metadata
        .insert("revision".to_string(), serde_json::json!(2));
    let second = build(&input).unwrap().into_archive().unwrap();

    let stored: Arc<Mutex<Option<Bytes>>> = Arc::new(Mutex::new(None));
    let sink = stored.clone();
    let mut store = MockObjectStore::new();
    store
        .expect_put()
        .withf(|key, _body| key == "docs-testing/latest.tar.gz")
        .times(2)
        .returning(move |_key, body| {
            *sink.lock().unwrap() = Some(body);
            Ok(())
        });

    docs_bucket::publish::publish(&store, &first, "docs-testing")
        .await
        .unwrap();
    docs_bucket::publish::publish(&store, &second, "docs-testing")
        .await
        .unwrap();

    let last = stored.lock().unwrap().clone().unwrap();
    assert_eq!(
        &last[..],
        second.as_bytes(),
        "the key holds whatever was published last"
    );
}

#[tokio::test]
async fn empty_build_skips_publish_entirely() {
    let mut store = MockObjectStore::new();
    // No content inputs: the publish step must make no network call at all.
    store.expect_put().times(0);

    let input = ArchiveInput {
        tier: "core".to_string(),
        project: Some("docs-testing".to_string()),
        publish: true,
        ..Default::default()
    };
    let outcome = document(&input, Some(&store))
        .await
        .expect("an empty build with publish requested is not an error");
    assert!(outcome.is_empty());
}

#[tokio::test]
async fn publish_without_project_is_an_input_error() {
    let mut store = MockObjectStore::new();
    store.expect_put().times(0);

    let err = document(&schemas_input(None, true), Some(&store))
        .await
        .expect_err("publishing without a project must fail");
    assert!(matches!(err, DocsError::Input("project")), "got {err:?}");
}

#[tokio::test]
async fn transport_failure_surfaces_as_upload_error() {
    let archive = build(&schemas_input(Some("docs-testing"), false))
        .unwrap()
        .into_archive()
        .unwrap();

    let mut store = MockObjectStore::new();
    store
        .expect_put()
        .times(1)
        .returning(|_key, _body| Err(DocsError::Upload("connection reset".to_string())));

    let err = docs_bucket::publish::publish(&store, &archive, "docs-testing")
        .await
        .expect_err("transport failure must propagate");
    assert!(matches!(err, DocsError::Upload(_)), "got {err:?}");
}

#[tokio::test]
async fn rejected_credentials_surface_as_auth_error() {
    let archive = build(&schemas_input(Some("docs-testing"), false))
        .unwrap()
        .into_archive()
        .unwrap();

    let mut store = MockObjectStore::new();
    store
        .expect_put()
        .times(1)
        .returning(|_key, _body| Err(DocsError::Auth("forbidden".to_string())));

    let err = docs_bucket::publish::publish(&store, &archive, "docs-testing")
        .await
        .expect_err("rejected credentials must propagate");
    assert!(matches!(err, DocsError::Auth(_)), "got {err:?}");
}

#[tokio::test]
async fn fetch_of_unpublished_project_is_not_found() {
    let mut store = MockObjectStore::new();
    store
        .expect_get()
        .withf(|key| key == "ghost/latest.tar.gz")
        .times(1)
        .returning(|key| {
            Err(DocsError::NotFound {
                key: key.to_string(),
            })
        });

    let err = fetch(&store, "ghost")
        .await
        .err()
        .expect("fetching an unpublished project must fail");
    match err {
        DocsError::NotFound { key } => assert_eq!(key, "ghost/latest.tar.gz"),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_with_empty_project_never_touches_the_bucket() {
    let mut store = MockObjectStore::new();
    store.expect_get().times(0);

    let err = fetch(&store, "")
        .await
        .err()
        .expect("empty project must fail");
    assert!(matches!(err, DocsError::Input("project")), "got {err:?}");
}

#[test]
fn empty_credentials_fail_before_any_request() {
    let err = BucketClient::new("https://bucket.example", "docs", "")
        .expect_err("an empty token must be rejected at construction");
    assert!(matches!(err, DocsError::Auth(_)), "got {err:?}");
}

#[test]
#[serial]
fn bucket_client_from_env_requires_token() {
    let _ = dotenvy::dotenv();
    std::env::set_var("DOCS_BUCKET_ENDPOINT", "https://bucket.example");
    std::env::set_var("DOCS_BUCKET_NAME", "docs");
    std::env::remove_var("DOCS_BUCKET_TOKEN");

    let err = BucketClient::new_from_env().expect_err("missing token must fail");
    assert!(matches!(err, DocsError::Auth(_)), "got {err:?}");

    std::env::set_var("DOCS_BUCKET_TOKEN", "secret");
    assert!(BucketClient::new_from_env().is_ok());
}
