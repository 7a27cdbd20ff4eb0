use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use selfup_core::{
    Applier, ApplyError, GithubOptions, GithubResolver, UpdateCycleError, run_update_cycle_with,
};
use selfup_platform::PlatformTarget;
use selfup_resolver::{
    ArchiveFormat, ResolutionError, ResolveRequest, Resolver, UpdateOutcome, UpdatePayload,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ORIGINAL: &[u8] = b"running-binary v1.2.3";
const UPDATED: &[u8] = b"released-binary v1.3.0";

fn tar_gz(name: &str, contents: &[u8]) -> Vec<u8> {
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_entry_type(tar::EntryType::Regular);
    builder
        .append_data(&mut header, name, contents)
        .expect("tar entry should be appended");
    builder
        .into_inner()
        .expect("tar archive should be finalized")
        .finish()
        .expect("gzip stream should be finalized")
}

fn install_dir() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("install dir should be created");
    let target = dir.path().join("tool");
    std::fs::write(&target, ORIGINAL).expect("running binary should be written");
    (dir, target)
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("install dir should be readable")
        .map(|entry| {
            entry
                .expect("dir entry should be readable")
                .file_name()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    names.sort();
    names
}

fn host_asset_name() -> String {
    let target = PlatformTarget::current();
    format!("tool-{}-{}.tar.gz", target.os_id(), target.arch_id())
}

async fn github_server(tag: &str, archive: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "tag_name": tag,
        "assets": [{
            "name": host_asset_name(),
            "url": format!("{}/assets/7", server.uri()),
        }],
    });
    Mock::given(method("GET"))
        .and(path("/repos/acme/tool/releases/latest"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/assets/7"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&server)
        .await;
    server
}

fn github_resolver(server: &MockServer) -> GithubResolver {
    let mut options = GithubOptions::new("acme", "tool");
    options.api_base = server.uri();
    GithubResolver::new(reqwest::Client::new(), options).expect("options should be valid")
}

#[tokio::test]
async fn current_release_returns_false_without_touching_disk() {
    let (dir, target) = install_dir();
    let server = github_server("v1.2.3", tar_gz("tool", UPDATED)).await;

    let updated = run_update_cycle_with(
        &github_resolver(&server),
        &ResolveRequest::new("v1.2.3"),
        &Applier::new().with_target(&target),
    )
    .await
    .expect("cycle should succeed");

    assert!(!updated);
    assert_eq!(entries(dir.path()), vec!["tool".to_string()]);
    assert_eq!(std::fs::read(&target).expect("binary should exist"), ORIGINAL);
}

#[tokio::test]
async fn newer_release_replaces_binary_and_leaves_no_sidecars() {
    let (dir, target) = install_dir();
    let server = github_server("v1.3.0", tar_gz("tool", UPDATED)).await;

    let updated = run_update_cycle_with(
        &github_resolver(&server),
        &ResolveRequest::new("v1.2.3"),
        &Applier::new().with_target(&target),
    )
    .await
    .expect("cycle should succeed");

    assert!(updated);
    assert_eq!(std::fs::read(&target).expect("binary should exist"), UPDATED);
    assert!(!dir.path().join(".tool.new").exists());
    #[cfg(not(windows))]
    assert_eq!(entries(dir.path()), vec!["tool".to_string()]);
}

#[tokio::test]
async fn resolution_errors_are_propagated() {
    let (_dir, target) = install_dir();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let error = run_update_cycle_with(
        &github_resolver(&server),
        &ResolveRequest::new("v1.2.3"),
        &Applier::new().with_target(&target),
    )
    .await
    .expect_err("a failing release source must not look like 'no update'");

    assert!(matches!(
        error,
        UpdateCycleError::Resolve(ResolutionError::MetadataStatus { status: 500, .. })
    ));
    assert!(!error.is_fatal());
    assert_eq!(std::fs::read(&target).expect("binary should exist"), ORIGINAL);
}

#[tokio::test]
async fn archive_without_binary_is_an_apply_error() {
    let (_dir, target) = install_dir();
    let server = github_server("v1.3.0", tar_gz("README.md", b"docs")).await;

    let error = run_update_cycle_with(
        &github_resolver(&server),
        &ResolveRequest::new("v1.2.3"),
        &Applier::new().with_target(&target),
    )
    .await
    .expect_err("missing binary should fail the cycle");

    assert!(matches!(
        error,
        UpdateCycleError::Apply(ApplyError::BinaryNotInArchive { .. })
    ));
    assert_eq!(std::fs::read(&target).expect("binary should exist"), ORIGINAL);
}

struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    closed: Arc<AtomicBool>,
}

impl Read for TrackedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct InMemoryResolver {
    archive: Vec<u8>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Resolver for InMemoryResolver {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn resolve(&self, _request: &ResolveRequest) -> Result<UpdateOutcome, ResolutionError> {
        let reader = TrackedReader {
            inner: Cursor::new(self.archive.clone()),
            closed: Arc::clone(&self.closed),
        };
        Ok(UpdateOutcome::Update(UpdatePayload::new(
            Box::new(reader),
            ArchiveFormat::TarGz,
            "tool.tar.gz",
        )))
    }
}

#[tokio::test]
async fn payload_is_closed_on_success_and_failure() {
    for (archive, should_succeed) in [
        (tar_gz("tool", UPDATED), true),
        (b"garbage".to_vec(), false),
    ] {
        let (_dir, target) = install_dir();
        let closed = Arc::new(AtomicBool::new(false));
        let resolver = InMemoryResolver {
            archive,
            closed: Arc::clone(&closed),
        };

        let result = run_update_cycle_with(
            &resolver,
            &ResolveRequest::new("v1.2.3"),
            &Applier::new().with_target(&target),
        )
        .await;

        assert_eq!(result.is_ok(), should_succeed);
        assert!(closed.load(Ordering::SeqCst), "payload stream should be closed");
    }
}
