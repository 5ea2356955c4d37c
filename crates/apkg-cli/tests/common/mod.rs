//! Shared fixtures: package archives built in memory, repositories served
//! by mockito, and a reporter that records what it was told.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use apkg_cli::LedgerHandle;
use apkg_cli::config::DesiredState;
use apkg_cli::ops::Context;
use apkg_core::{Installed, Layout, LedgerStore, Reporter};
use apkg_schema::{PackageName, Version};
use flate2::Compression;
use flate2::write::GzEncoder;
use mockito::{Mock, ServerGuard};
use tempfile::TempDir;

/// A package as published by a test repository.
#[derive(Debug, Clone)]
pub struct TestPkg {
    pub name: String,
    pub version: String,
    pub deps: Vec<String>,
    pub files: Vec<(String, String)>,
    pub hooks: Vec<String>,
}

impl TestPkg {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            deps: Vec::new(),
            files: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn dep(mut self, dep: &str) -> Self {
        self.deps.push(dep.to_string());
        self
    }

    pub fn file(mut self, path: &str, content: &str) -> Self {
        self.files.push((path.to_string(), content.to_string()));
        self
    }

    pub fn hook(mut self, name: &str) -> Self {
        self.hooks.push(name.to_string());
        self
    }

    pub fn filename(&self) -> String {
        format!("{}-{}.apk", self.name, self.version)
    }

    /// Signature, control and data segments as separate gzip members.
    pub fn archive(&self) -> Vec<u8> {
        let mut bytes = gz_tar(&[(".SIGN.RSA.test.rsa.pub".into(), b"sig".to_vec(), 0o644)]);

        let mut control = vec![(
            ".PKGINFO".to_string(),
            format!("pkgname = {}\npkgver = {}\n", self.name, self.version).into_bytes(),
            0o644,
        )];
        for hook in &self.hooks {
            control.push((hook.clone(), b"#!/bin/sh\nexit 0\n".to_vec(), 0o755));
        }
        bytes.extend(gz_tar(&control));

        let data: Vec<(String, Vec<u8>, u32)> = self
            .files
            .iter()
            .map(|(path, content)| {
                let mode = if path.contains("bin/") { 0o755 } else { 0o644 };
                (path.clone(), content.clone().into_bytes(), mode)
            })
            .collect();
        bytes.extend(gz_tar(&data));
        bytes
    }
}

pub fn gz_tar(entries: &[(String, Vec<u8>, u32)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder
            .append_data(&mut header, path, data.as_slice())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

pub fn index_text(pkgs: &[TestPkg]) -> String {
    let mut text = String::new();
    for pkg in pkgs {
        text.push_str(&format!("C:Q1{}=\nP:{}\nV:{}\n", pkg.name, pkg.name, pkg.version));
        if !pkg.deps.is_empty() {
            text.push_str(&format!("D:{}\n", pkg.deps.join(" ")));
        }
        text.push('\n');
    }
    text
}

pub fn index_archive(pkgs: &[TestPkg]) -> Vec<u8> {
    let mut bytes = gz_tar(&[(".SIGN.RSA.test.rsa.pub".into(), b"sig".to_vec(), 0o644)]);
    bytes.extend(gz_tar(&[
        ("DESCRIPTION".into(), b"test repository".to_vec(), 0o644),
        ("APKINDEX".into(), index_text(pkgs).into_bytes(), 0o644),
    ]));
    bytes
}

/// Reporter that keeps every event as a `kind:details` string.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<String>>,
}

impl RecordingReporter {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.events().iter().any(|e| e.contains(needle))
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

impl Reporter for RecordingReporter {
    fn section(&self, title: &str) {
        self.push(format!("section:{title}"));
    }
    fn downloading(&self, name: &PackageName, _: &Version, current: u64, _: Option<u64>) {
        if current == 0 {
            self.push(format!("download:{name}"));
        }
    }
    fn extracting(&self, name: &PackageName, _: &Version) {
        self.push(format!("extract:{name}"));
    }
    fn installing(&self, name: &PackageName, _: &Version) {
        self.push(format!("install:{name}"));
    }
    fn removing(&self, name: &PackageName, _: &Version) {
        self.push(format!("remove:{name}"));
    }
    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        self.push(format!("done:{name}:{version}:{detail}"));
    }
    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        self.push(format!("failed:{name}:{version}:{reason}"));
    }
    fn info(&self, msg: &str) {
        self.push(format!("info:{msg}"));
    }
    fn success(&self, msg: &str) {
        self.push(format!("success:{msg}"));
    }
    fn warning(&self, msg: &str) {
        self.push(format!("warning:{msg}"));
    }
    fn summary(&self, count: usize, action: &str, _: f64) {
        self.push(format!("summary:{count}:{action}"));
    }
    fn summary_plain(&self, count: usize, status: &str) {
        self.push(format!("summary:{count}:{status}"));
    }
}

/// One temp directory holding `apkg.toml`, the state dir and the target
/// root, plus a mock server hosting any number of repositories.
pub struct Fixture {
    pub server: ServerGuard,
    pub tmp: TempDir,
    pub config: PathBuf,
    pub root: PathBuf,
    pub layout: Layout,
    pub reporter: Arc<RecordingReporter>,
    pub ctx: Context,
    mocks: HashMap<String, Vec<Mock>>,
}

impl Fixture {
    pub async fn new() -> Self {
        let server = mockito::Server::new_async().await;
        let tmp = tempfile::tempdir().unwrap();
        let layout = Layout::new(tmp.path().join("state"));
        let reporter = Arc::new(RecordingReporter::default());
        let ctx = Context::new(
            LedgerHandle::spawn(LedgerStore::new(layout.clone())),
            layout.clone(),
            reqwest::Client::new(),
            reporter.clone(),
        );

        Self {
            config: tmp.path().join("apkg.toml"),
            root: tmp.path().join("root"),
            server,
            tmp,
            layout,
            reporter,
            ctx,
            mocks: HashMap::new(),
        }
    }

    pub fn repo_url(&self, repo: &str) -> String {
        format!("{}/{repo}", self.server.url())
    }

    async fn retract(&mut self, repo: &str) {
        if let Some(old) = self.mocks.remove(repo) {
            for mock in old {
                mock.remove_async().await;
            }
        }
    }

    pub async fn serve_index(&mut self, repo: &str, pkgs: &[TestPkg]) -> Mock {
        self.server
            .mock("GET", format!("/{repo}/APKINDEX.tar.gz").as_str())
            .with_status(200)
            .with_header("content-type", "application/gzip")
            .with_body(index_archive(pkgs))
            .create_async()
            .await
    }

    pub async fn serve_archive(&mut self, repo: &str, pkg: &TestPkg) -> Mock {
        self.server
            .mock("GET", format!("/{repo}/{}", pkg.filename()).as_str())
            .with_status(200)
            .with_header("content-type", "application/octet-stream")
            .with_body(pkg.archive())
            .create_async()
            .await
    }

    /// Replace everything `repo` serves with `pkgs` and their archives.
    pub async fn publish(&mut self, repo: &str, pkgs: &[TestPkg]) {
        self.retract(repo).await;
        let mut mocks = vec![self.serve_index(repo, pkgs).await];
        for pkg in pkgs {
            mocks.push(self.serve_archive(repo, pkg).await);
        }
        self.mocks.insert(repo.to_string(), mocks);
    }

    /// Replace what `repo` serves with an index only; no archives.
    pub async fn publish_index(&mut self, repo: &str, pkgs: &[TestPkg]) {
        self.retract(repo).await;
        let index = self.serve_index(repo, pkgs).await;
        self.mocks.insert(repo.to_string(), vec![index]);
    }

    pub fn write_config(&self, repos: &[&str], packages: &[&str], extra: &str) {
        let repos: Vec<String> = repos
            .iter()
            .map(|r| format!("\"{}\"", self.repo_url(r)))
            .collect();
        let packages: Vec<String> = packages.iter().map(|p| format!("\"{p}\"")).collect();
        let text = format!(
            "# test config\nrepos = [{}]\npackages = [{}]\n{extra}",
            repos.join(", "),
            packages.join(", ")
        );
        std::fs::write(&self.config, text).unwrap();
    }

    pub fn desired(&self) -> DesiredState {
        DesiredState::load(&self.config).unwrap()
    }

    pub fn store(&self) -> LedgerStore {
        LedgerStore::new(self.layout.clone())
    }

    pub fn ledger(&self) -> Installed {
        self.store().load().unwrap()
    }

    pub fn ledger_versions(&self) -> Vec<(String, String)> {
        self.ledger()
            .into_iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    pub fn manifest(&self, name: &str) -> Option<Vec<PathBuf>> {
        self.store().load_manifest(name).unwrap()
    }

    pub fn installed_file(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Every path under the temp dir with file contents or link targets.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
        snapshot(self.tmp.path())
    }
}

pub fn snapshot(base: &Path) -> BTreeMap<PathBuf, Option<Vec<u8>>> {
    walkdir::WalkDir::new(base)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            let entry = entry.unwrap();
            let rel = entry.path().strip_prefix(base).unwrap().to_path_buf();
            let content = if entry.file_type().is_file() {
                Some(std::fs::read(entry.path()).unwrap())
            } else if entry.file_type().is_symlink() {
                Some(
                    std::fs::read_link(entry.path())
                        .unwrap()
                        .into_os_string()
                        .into_encoded_bytes(),
                )
            } else {
                None
            };
            (rel, content)
        })
        .collect()
}

pub fn paths(list: &[&str]) -> Vec<PathBuf> {
    list.iter().map(PathBuf::from).collect()
}
