//! Materializes resolved wheel URLs into a PEP 503 directory tree that
//! `pip install --index-url file://<root>/` can consume offline.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use wheelhouse_domain::{ArtifactListing, WheelFilename};

use crate::progress::ProgressReporter;
use crate::runtime::effects::ArtifactDownloader;
use crate::store::DOWNLOAD_ATTEMPTS;

mod html;

pub use html::{render_package_page, render_root_page};

const PAGE_NAME: &str = "index.html";
const PART_SUFFIX: &str = ".part";

#[derive(Debug, Clone)]
pub struct MirrorOptions {
    pub root: PathBuf,
    pub dry_run: bool,
    pub workers: usize,
    /// Age after which an existing `.part` file no longer counts as a live claim.
    pub stale_after: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactState {
    Fetched,
    Cached,
    Planned,
    InFlight,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MirroredArtifact {
    pub package: String,
    pub filename: String,
    pub state: ArtifactState,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MirrorSummary {
    pub requested: usize,
    pub fetched: usize,
    pub cached: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_fetched: u64,
    pub errors: Vec<String>,
    pub root: PathBuf,
    pub dry_run: bool,
    pub packages: Vec<String>,
    pub artifacts: Vec<MirroredArtifact>,
    pub hint: String,
}

#[derive(Debug, Clone)]
struct PlannedArtifact {
    package: String,
    filename: String,
    url: String,
    dest: PathBuf,
}

enum FetchOutcome {
    Fetched(u64),
    InFlight,
    Failed(anyhow::Error),
}

pub struct MirrorBuilder<'a> {
    downloader: &'a dyn ArtifactDownloader,
    options: MirrorOptions,
}

impl<'a> MirrorBuilder<'a> {
    #[must_use]
    pub fn new(downloader: &'a dyn ArtifactDownloader, options: MirrorOptions) -> Self {
        Self {
            downloader,
            options,
        }
    }

    /// Download every listed wheel into the mirror and rewrite its pages.
    ///
    /// Per-artifact failures are recorded in the summary; only failures to
    /// lay out the mirror itself are returned as errors.
    ///
    /// # Errors
    /// Returns an error if mirror directories or pages cannot be written.
    pub fn build(&self, artifacts: &[ArtifactListing]) -> Result<MirrorSummary> {
        let root = &self.options.root;
        let mut summary = MirrorSummary {
            requested: artifacts.len(),
            root: root.clone(),
            dry_run: self.options.dry_run,
            hint: install_hint(root, "<package>"),
            ..MirrorSummary::default()
        };

        let plan = self.plan(artifacts, &mut summary);
        let mut states: Vec<ArtifactState> = Vec::with_capacity(plan.len());
        let mut pending = Vec::new();
        for (idx, artifact) in plan.iter().enumerate() {
            if artifact.dest.is_file() {
                debug!(file = %artifact.filename, "already mirrored");
                summary.cached += 1;
                states.push(ArtifactState::Cached);
            } else {
                states.push(ArtifactState::Planned);
                pending.push(idx);
            }
        }

        if self.options.dry_run {
            info!(
                pending = pending.len(),
                cached = summary.cached,
                "dry run; nothing written"
            );
            summary.artifacts = artifacts_with_states(&plan, &states);
            summary.packages = distinct_packages(&plan);
            return Ok(summary);
        }

        fs_err::create_dir_all(root)
            .with_context(|| format!("failed to create mirror root {}", root.display()))?;
        for package in distinct_packages(&plan) {
            fs_err::create_dir_all(root.join(&package))?;
        }

        let jobs: Vec<(usize, PlannedArtifact)> = pending
            .iter()
            .map(|idx| (*idx, plan[*idx].clone()))
            .collect();
        for (idx, outcome) in self.run_downloads(jobs) {
            let artifact = &plan[idx];
            match outcome {
                FetchOutcome::Fetched(bytes) => {
                    info!(file = %artifact.filename, bytes, "downloaded");
                    summary.fetched += 1;
                    summary.bytes_fetched += bytes;
                    states[idx] = ArtifactState::Fetched;
                }
                FetchOutcome::InFlight => {
                    warn!(
                        file = %artifact.filename,
                        "another download holds {}{PART_SUFFIX}; skipping",
                        artifact.filename
                    );
                    summary.skipped += 1;
                    states[idx] = ArtifactState::InFlight;
                }
                FetchOutcome::Failed(err) => {
                    warn!(file = %artifact.filename, "download failed: {err:#}");
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {err:#}", artifact.filename));
                    states[idx] = ArtifactState::Failed;
                }
            }
        }

        summary.packages = write_pages(root, &plan)?;
        summary.artifacts = artifacts_with_states(&plan, &states);
        Ok(summary)
    }

    fn plan(
        &self,
        artifacts: &[ArtifactListing],
        summary: &mut MirrorSummary,
    ) -> Vec<PlannedArtifact> {
        let mut planned: IndexMap<PathBuf, PlannedArtifact> = IndexMap::new();
        for ArtifactListing { filename, url } in artifacts {
            let parsed = if is_plain_file_name(filename) {
                filename.parse::<WheelFilename>().map_err(|err| err.to_string())
            } else {
                Err(format!("`{filename}` is not a plain file name"))
            };
            let wheel = match parsed {
                Ok(wheel) => wheel,
                Err(err) => {
                    warn!(%url, "skipping artifact: {err}");
                    summary.skipped += 1;
                    summary.errors.push(format!("{url}: {err}"));
                    continue;
                }
            };
            let package = wheel.normalized_name();
            let dest = self.options.root.join(&package).join(filename);
            if planned.contains_key(&dest) {
                debug!(%url, "duplicate artifact path; keeping the first URL");
                continue;
            }
            planned.insert(
                dest.clone(),
                PlannedArtifact {
                    package,
                    filename: filename.clone(),
                    url: url.clone(),
                    dest,
                },
            );
        }
        planned.into_values().collect()
    }

    fn run_downloads(&self, jobs: Vec<(usize, PlannedArtifact)>) -> Vec<(usize, FetchOutcome)> {
        if jobs.is_empty() {
            return Vec::new();
        }
        let worker_count = self.options.workers.clamp(1, jobs.len());
        let total = jobs.len();
        let progress = ProgressReporter::bar("downloading wheels", total);

        let (job_tx, job_rx) = mpsc::channel();
        for job in jobs {
            if job_tx.send(job).is_err() {
                break;
            }
        }
        drop(job_tx);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, result_rx) = mpsc::channel();
        let downloader = self.downloader;
        let stale_after = self.options.stale_after;

        thread::scope(|scope| {
            for _ in 0..worker_count {
                let work_rx = Arc::clone(&job_rx);
                let result_tx = result_tx.clone();
                scope.spawn(move || loop {
                    let job = {
                        let Ok(guard) = work_rx.lock() else {
                            break;
                        };
                        match guard.recv() {
                            Ok(job) => job,
                            Err(_) => break,
                        }
                    };
                    let (idx, artifact): (usize, PlannedArtifact) = job;
                    let outcome = fetch_artifact(downloader, &artifact, stale_after);
                    if result_tx.send((idx, outcome)).is_err() {
                        break;
                    }
                });
            }
            drop(result_tx);

            let mut results = Vec::with_capacity(total);
            for result in result_rx {
                progress.increment();
                results.push(result);
            }
            results
        })
    }
}

/// `pip install` line for a mirror at `root`. Packages live in per-name
/// subdirectories, which pip only reads through `--index-url`.
#[must_use]
pub fn install_hint(root: &Path, package: &str) -> String {
    let location = std::path::absolute(root)
        .ok()
        .and_then(|absolute| Url::from_directory_path(absolute).ok())
        .map_or_else(|| root.display().to_string(), String::from);
    format!("pip install --index-url {location} {package}")
}

fn is_plain_file_name(filename: &str) -> bool {
    !filename.is_empty()
        && Path::new(filename).file_name().and_then(|name| name.to_str()) == Some(filename)
}

/// Take ownership of `part`, reclaiming it when a previous run left it
/// behind. `None` means a live download elsewhere holds the claim.
fn claim_part(part: &Path, stale_after: Duration) -> io::Result<Option<fs_err::File>> {
    let create = || fs_err::OpenOptions::new().write(true).create_new(true).open(part);
    match create() {
        Ok(file) => return Ok(Some(file)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
        Err(err) => return Err(err),
    }

    let age = match fs_err::metadata(part) {
        Ok(meta) => meta.modified()?.elapsed().unwrap_or_default(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => stale_after,
        Err(err) => return Err(err),
    };
    if age < stale_after {
        return Ok(None);
    }
    warn!(
        path = %part.display(),
        age_secs = age.as_secs(),
        "reclaiming abandoned partial download"
    );
    match fs_err::remove_file(part) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    match create() {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(err),
    }
}

fn fetch_artifact(
    downloader: &dyn ArtifactDownloader,
    artifact: &PlannedArtifact,
    stale_after: Duration,
) -> FetchOutcome {
    let part = artifact
        .dest
        .with_file_name(format!("{}{PART_SUFFIX}", artifact.filename));
    let mut file = match claim_part(&part, stale_after) {
        Ok(Some(file)) => file,
        Ok(None) => return FetchOutcome::InFlight,
        Err(err) => return FetchOutcome::Failed(err.into()),
    };

    let mut last_err = None;
    let mut written = None;
    for attempt in 1..=DOWNLOAD_ATTEMPTS {
        if attempt > 1 {
            debug!(file = %artifact.filename, attempt, "retrying download");
            if let Err(err) = file.set_len(0).and_then(|()| file.seek(SeekFrom::Start(0))) {
                last_err = Some(anyhow::Error::from(err));
                break;
            }
        }
        match downloader.download(&artifact.url, &mut file) {
            Ok(bytes) => {
                written = Some(bytes);
                break;
            }
            Err(err) => last_err = Some(err),
        }
    }
    drop(file);

    let Some(bytes) = written else {
        let _ = fs_err::remove_file(&part);
        return FetchOutcome::Failed(last_err.unwrap_or_else(|| {
            anyhow!("failed to download {}; no attempts left", artifact.filename)
        }));
    };
    match fs_err::rename(&part, &artifact.dest) {
        Ok(()) => FetchOutcome::Fetched(bytes),
        Err(err) => {
            let _ = fs_err::remove_file(&part);
            FetchOutcome::Failed(err.into())
        }
    }
}

/// Rewrite every touched package page plus the root page, listing only the
/// artifacts of this run that are on disk.
fn write_pages(root: &Path, plan: &[PlannedArtifact]) -> Result<Vec<String>> {
    let mut pages: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for artifact in plan.iter().filter(|artifact| artifact.dest.is_file()) {
        pages
            .entry(artifact.package.as_str())
            .or_default()
            .insert(artifact.filename.as_str());
    }

    for (package, files) in &pages {
        let files: Vec<String> = files.iter().map(ToString::to_string).collect();
        let page = root.join(package).join(PAGE_NAME);
        fs_err::write(&page, render_package_page(package, &files))
            .with_context(|| format!("failed to write {}", page.display()))?;
    }

    let packages: Vec<String> = pages.keys().map(ToString::to_string).collect();
    let page = root.join(PAGE_NAME);
    fs_err::write(&page, render_root_page(&packages))
        .with_context(|| format!("failed to write {}", page.display()))?;
    Ok(packages)
}

fn distinct_packages(plan: &[PlannedArtifact]) -> Vec<String> {
    let packages: BTreeSet<&str> = plan
        .iter()
        .map(|artifact| artifact.package.as_str())
        .collect();
    packages.into_iter().map(ToString::to_string).collect()
}

fn artifacts_with_states(
    plan: &[PlannedArtifact],
    states: &[ArtifactState],
) -> Vec<MirroredArtifact> {
    plan.iter()
        .zip(states)
        .map(|(artifact, state)| MirroredArtifact {
            package: artifact.package.clone(),
            filename: artifact.filename.clone(),
            state: *state,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    use tempfile::tempdir;

    const FILES: &str = "https://files.example/packages";

    #[derive(Default)]
    struct FakeDownloader {
        bodies: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDownloader {
        fn serve(&mut self, filename: &str) -> ArtifactListing {
            let url = format!("{FILES}/{filename}");
            self.bodies
                .insert(url.clone(), format!("wheel bytes of {filename}").into_bytes());
            ArtifactListing::new(filename, url)
        }

        fn calls(&self) -> usize {
            self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
        }
    }

    impl ArtifactDownloader for FakeDownloader {
        fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(url.to_string());
            }
            let body = self
                .bodies
                .get(url)
                .ok_or_else(|| anyhow!("404 Not Found for {url}"))?;
            dest.write_all(body)?;
            Ok(body.len() as u64)
        }
    }

    fn options(root: &Path) -> MirrorOptions {
        MirrorOptions {
            root: root.to_path_buf(),
            dry_run: false,
            workers: 4,
            stale_after: Duration::from_secs(600),
        }
    }

    fn age(path: &Path, by: Duration) -> Result<()> {
        let file = std::fs::File::options().write(true).open(path)?;
        file.set_modified(std::time::SystemTime::now() - by)?;
        Ok(())
    }

    #[test]
    fn one_package_with_two_wheels_gets_two_links_and_one_root_entry() -> Result<()> {
        let temp = tempdir()?;
        let mut downloader = FakeDownloader::default();
        let artifacts = vec![
            downloader.serve("Demo_Pkg-1.0-py3-none-any.whl"),
            downloader.serve("demo.pkg-1.0-cp311-cp311-manylinux_2_17_x86_64.whl"),
        ];

        let summary = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(summary.fetched, 2);
        assert_eq!(summary.packages, ["demo-pkg"]);

        let package_page = fs_err::read_to_string(temp.path().join("demo-pkg").join(PAGE_NAME))?;
        assert_eq!(package_page.matches("<a href=").count(), 2);
        let root_page = fs_err::read_to_string(temp.path().join(PAGE_NAME))?;
        assert_eq!(root_page.matches("<a href=").count(), 1);
        assert!(root_page.contains("href=\"demo-pkg/\""));
        assert!(temp
            .path()
            .join("demo-pkg")
            .join("Demo_Pkg-1.0-py3-none-any.whl")
            .is_file());
        Ok(())
    }

    #[test]
    fn existing_files_are_not_downloaded_again() -> Result<()> {
        let temp = tempdir()?;
        let mut downloader = FakeDownloader::default();
        let artifacts = vec![
            downloader.serve("idna-3.6-py3-none-any.whl"),
            downloader.serve("certifi-2024.2.2-py3-none-any.whl"),
        ];
        fs_err::create_dir_all(temp.path().join("idna"))?;
        fs_err::write(
            temp.path().join("idna").join("idna-3.6-py3-none-any.whl"),
            b"already here",
        )?;

        let summary = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(summary.cached, 1);
        assert_eq!(summary.fetched, 1);
        assert_eq!(downloader.calls(), 1);

        let again = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(again.cached, 2);
        assert_eq!(downloader.calls(), 1);
        Ok(())
    }

    #[test]
    fn dry_run_writes_nothing() -> Result<()> {
        let temp = tempdir()?;
        let root = temp.path().join("mirror");
        let mut downloader = FakeDownloader::default();
        let artifacts = vec![downloader.serve("six-1.16.0-py2.py3-none-any.whl")];

        let summary = MirrorBuilder::new(
            &downloader,
            MirrorOptions {
                dry_run: true,
                ..options(&root)
            },
        )
        .build(&artifacts)?;
        assert!(summary.dry_run);
        assert_eq!(summary.artifacts[0].state, ArtifactState::Planned);
        assert_eq!(summary.packages, ["six"]);
        assert_eq!(downloader.calls(), 0);
        assert!(!root.exists());
        Ok(())
    }

    #[test]
    fn failures_and_bad_names_do_not_stop_the_run() -> Result<()> {
        let temp = tempdir()?;
        let mut downloader = FakeDownloader::default();
        let good = downloader.serve("attrs-23.2.0-py3-none-any.whl");
        let artifacts = vec![
            ArtifactListing::new(
                "missing-1.0-py3-none-any.whl",
                format!("{FILES}/missing-1.0-py3-none-any.whl"),
            ),
            ArtifactListing::new("legacy-1.0.tar.gz", format!("{FILES}/legacy-1.0.tar.gz")),
            ArtifactListing::new(
                "../escape-1.0-py3-none-any.whl",
                format!("{FILES}/escape-1.0-py3-none-any.whl"),
            ),
            good,
        ];

        let summary = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(summary.requested, 4);
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.errors.len(), 3);
        assert!(!temp.path().join("escape-1.0-py3-none-any.whl").exists());
        assert_eq!(summary.packages, ["attrs"]);
        assert!(!temp
            .path()
            .join("missing")
            .join("missing-1.0-py3-none-any.whl.part")
            .exists());
        assert!(!temp.path().join("missing").join(PAGE_NAME).exists());
        Ok(())
    }

    #[test]
    fn claimed_part_file_is_left_to_its_owner() -> Result<()> {
        let temp = tempdir()?;
        let mut downloader = FakeDownloader::default();
        let artifacts = vec![downloader.serve("wheel-0.42.0-py3-none-any.whl")];
        fs_err::create_dir_all(temp.path().join("wheel"))?;
        fs_err::write(
            temp.path().join("wheel").join("wheel-0.42.0-py3-none-any.whl.part"),
            b"",
        )?;

        let summary = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.artifacts[0].state, ArtifactState::InFlight);
        assert_eq!(downloader.calls(), 0);
        Ok(())
    }

    #[test]
    fn abandoned_part_file_is_reclaimed() -> Result<()> {
        let temp = tempdir()?;
        let mut downloader = FakeDownloader::default();
        let artifacts = vec![downloader.serve("wheel-0.42.0-py3-none-any.whl")];
        let part = temp
            .path()
            .join("wheel")
            .join("wheel-0.42.0-py3-none-any.whl.part");
        fs_err::create_dir_all(temp.path().join("wheel"))?;
        fs_err::write(&part, b"half a wheel")?;
        age(&part, Duration::from_secs(3600))?;

        let summary = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(summary.fetched, 1);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.artifacts[0].state, ArtifactState::Fetched);
        assert_eq!(summary.packages, ["wheel"]);
        assert!(!part.exists());
        assert_eq!(
            fs_err::read(temp.path().join("wheel").join("wheel-0.42.0-py3-none-any.whl"))?,
            b"wheel bytes of wheel-0.42.0-py3-none-any.whl"
        );
        Ok(())
    }

    #[test]
    fn index_filename_is_used_over_the_encoded_url() -> Result<()> {
        let temp = tempdir()?;
        let mut downloader = FakeDownloader::default();
        let url = format!("{FILES}/torch-2.0.0%2Bcpu-cp311-cp311-linux_x86_64.whl");
        downloader.bodies.insert(url.clone(), b"torch".to_vec());
        let artifacts = vec![ArtifactListing::new(
            "torch-2.0.0+cpu-cp311-cp311-linux_x86_64.whl",
            url,
        )];

        let summary = MirrorBuilder::new(&downloader, options(temp.path())).build(&artifacts)?;
        assert_eq!(summary.fetched, 1);
        assert!(temp
            .path()
            .join("torch")
            .join("torch-2.0.0+cpu-cp311-cp311-linux_x86_64.whl")
            .is_file());
        let page = fs_err::read_to_string(temp.path().join("torch").join(PAGE_NAME))?;
        assert!(page.contains("torch-2.0.0+cpu-cp311-cp311-linux_x86_64.whl"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn install_hint_points_pip_at_the_index_root() {
        assert_eq!(
            install_hint(Path::new("/srv/offline_mirror"), "requests"),
            "pip install --index-url file:///srv/offline_mirror/ requests"
        );
        let relative = install_hint(Path::new("offline_mirror"), "six");
        assert!(relative.starts_with("pip install --index-url file:///"));
        assert!(relative.ends_with("/offline_mirror/ six"));
    }
}
