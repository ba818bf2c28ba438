//! Rebuild decisions for compiled function artifacts.
//!
//! An artifact is fresh only when it exists and is newer than both the
//! source file and the manifest. Anything that prevents a clean comparison
//! counts as stale.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use serde::Serialize;
use tracing::{debug, warn};

use crate::manifest::FunctionConfiguration;
use crate::workspace::BuildPaths;

/// Modification-time lookups.
pub trait FileStat {
  /// `Ok(None)` when nothing exists at `path`.
  fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>>;
}

/// `FileStat` backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStat;

impl FileStat for FsStat {
  fn modified(&self, path: &Path) -> io::Result<Option<SystemTime>> {
    match fs::metadata(path) {
      Ok(meta) => meta.modified().map(Some),
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum StaleReason {
  SourceMissing,
  BuildOutputMissing,
  ManifestNewer,
  SourceNewer,
  CheckFailed(String),
}

impl fmt::Display for StaleReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::SourceMissing => write!(f, "source file is missing"),
      Self::BuildOutputMissing => write!(f, "build output is missing"),
      Self::ManifestNewer => write!(f, "manifest changed since the last build"),
      Self::SourceNewer => write!(f, "source changed since the last build"),
      Self::CheckFailed(message) => write!(f, "could not compare timestamps: {}", message),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum Freshness {
  Fresh,
  Stale { reason: StaleReason },
}

impl Freshness {
  pub fn is_stale(&self) -> bool {
    matches!(self, Self::Stale { .. })
  }

  pub fn reason(&self) -> Option<&StaleReason> {
    match self {
      Self::Fresh => None,
      Self::Stale { reason } => Some(reason),
    }
  }

  fn stale(reason: StaleReason) -> Self {
    Self::Stale { reason }
  }
}

#[derive(Debug, Clone, Default)]
pub struct BuildFreshnessOracle<S = FsStat> {
  stat: S,
}

impl BuildFreshnessOracle<FsStat> {
  pub fn new() -> Self {
    Self { stat: FsStat }
  }
}

impl<S: FileStat> BuildFreshnessOracle<S> {
  pub fn with_stat(stat: S) -> Self {
    Self { stat }
  }

  pub fn needs_rebuild(&self, config: &FunctionConfiguration) -> bool {
    self.check(config).is_stale()
  }

  pub fn check(&self, config: &FunctionConfiguration) -> Freshness {
    let freshness = self.check_paths(config.source_file.as_deref(), &config.manifest_path, &config.build_paths());
    if let Some(reason) = freshness.reason() {
      debug!(function = %config.name, %reason, "rebuild needed");
    }
    freshness
  }

  /// Decide from explicit paths. Rules apply in order; the first match wins.
  pub fn check_paths(&self, source: Option<&Path>, manifest: &Path, build: &BuildPaths) -> Freshness {
    match self.compare(source, manifest, build) {
      Ok(freshness) => freshness,
      Err(e) => {
        warn!(error = %e, artifact = %build.artifact.display(), "freshness check failed, assuming stale");
        Freshness::stale(StaleReason::CheckFailed(e.to_string()))
      }
    }
  }

  fn compare(&self, source: Option<&Path>, manifest: &Path, build: &BuildPaths) -> io::Result<Freshness> {
    let Some(source_time) = source.map(|s| self.stat.modified(s)).transpose()?.flatten() else {
      return Ok(Freshness::stale(StaleReason::SourceMissing));
    };

    if self.stat.modified(&build.build_dir)?.is_none() {
      return Ok(Freshness::stale(StaleReason::BuildOutputMissing));
    }
    let Some(artifact_time) = self.stat.modified(&build.artifact)? else {
      return Ok(Freshness::stale(StaleReason::BuildOutputMissing));
    };

    if let Some(manifest_time) = self.stat.modified(manifest)?
      && manifest_time > artifact_time
    {
      return Ok(Freshness::stale(StaleReason::ManifestNewer));
    }

    if source_time > artifact_time {
      return Ok(Freshness::stale(StaleReason::SourceNewer));
    }

    Ok(Freshness::Fresh)
  }
}
