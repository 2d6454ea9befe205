//! Shared fixtures for the pipeline integration tests.
//!
//! Archives are plain tar streams and the unpack tool is `tar` behind a
//! tiny `sh` wrapper, so the tests need nothing beyond a POSIX userland.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use r13y_core::{ArchiveDescriptor, ArtifactRef, NarHash, StorePath};
use r13y_diff::{CommandSpec, DescriptorResolver, DiffConfig, DiffError, UnpackWait};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Unpack tool: `sh -c '...' unpack <dest-name>` extracting stdin into `<dest-name>`.
pub fn tar_unpack() -> CommandSpec {
    CommandSpec::new("sh")
        .arg("-c")
        .arg(r#"mkdir -p "$1" && tar -xf - -C "$1""#)
        .arg("unpack")
}

/// Build a tar stream from `(relative path, contents)` pairs.
pub fn tar_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let dir = tempfile::tempdir().unwrap();
    for (rel, contents) in files {
        let p = dir.path().join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, contents).unwrap();
    }
    let out = std::process::Command::new("tar")
        .arg("-C")
        .arg(dir.path())
        .args(["-cf", "-", "."])
        .output()
        .unwrap();
    assert!(out.status.success(), "tar failed: {}", String::from_utf8_lossy(&out.stderr));
    out.stdout
}

/// One artifact the fixtures know how to serve.
#[derive(Clone)]
pub struct Fixture {
    pub artifact: ArtifactRef,
    pub descriptor: ArchiveDescriptor,
}

impl Fixture {
    /// `id` seeds the artifact bytes, the store path and the NAR hash.
    pub fn new(id: u8, name: &str) -> Self {
        let prefix = format!("{id:02x}{}", "a".repeat(30));
        Self {
            artifact: ArtifactRef::from_bytes([id; 32]),
            descriptor: ArchiveDescriptor::new(
                NarHash::parse(&format!("sha256:{id:02x}narhash")).unwrap(),
                StorePath::parse(&format!("/nix/store/{prefix}-{name}")).unwrap(),
            ),
        }
    }

    pub fn nar_path(&self) -> String {
        format!(
            "/nar/{}/{}",
            self.descriptor.name_prefix(),
            self.descriptor.nar_hash
        )
    }

    pub async fn serve(&self, server: &MockServer, archive: Vec<u8>) {
        self.serve_with(server, ResponseTemplate::new(200).set_body_bytes(archive))
            .await;
    }

    pub async fn serve_with(&self, server: &MockServer, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(self.nar_path()))
            .respond_with(response)
            .mount(server)
            .await;
    }
}

/// Resolver answering from a fixed table.
#[derive(Default)]
pub struct StaticResolver {
    table: HashMap<ArtifactRef, ArchiveDescriptor>,
}

impl StaticResolver {
    pub fn with(mut self, fixture: &Fixture) -> Self {
        self.table
            .insert(fixture.artifact, fixture.descriptor.clone());
        self
    }
}

#[async_trait]
impl DescriptorResolver for StaticResolver {
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<ArchiveDescriptor, DiffError> {
        self.table
            .get(artifact)
            .cloned()
            .ok_or_else(|| DiffError::Resolution {
                artifact: artifact.to_hex(),
                reason: "unknown artifact".into(),
            })
    }
}

/// Config pointed at `server`, with workspaces under `root`.
pub fn config(server: &MockServer, root: &Path, diff: CommandSpec) -> DiffConfig {
    DiffConfig {
        binary_cache_url: server.uri(),
        unpack: tar_unpack(),
        diff,
        unpack_wait: UnpackWait::Bounded(Duration::from_secs(10)),
        workspace_root: Some(root.to_path_buf()),
        ..DiffConfig::default()
    }
}

/// Number of entries directly under `dir`.
pub fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
