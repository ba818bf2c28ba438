//! Function workspace layout.
//!
//! ```text
//! <workspace>/
//! ├── lamina-functions.json      # legacy registry (migrated away)
//! └── <function>/
//!     ├── template.yaml          # manifest
//!     ├── event.json             # generated test event
//!     └── build/
//!         ├── bootstrap          # compiled executable
//!         └── function.zip       # packaged archive
//! ```

use std::fmt;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::consts::{
  ARCHIVE_NAME, ARTIFACT_NAME, BUILD_DIR, EVENT_FILENAME, LEGACY_REGISTRY_FILENAME, MANIFEST_FILENAME,
};

/// Root directory holding one subdirectory per function.
///
/// Passed explicitly into every component that touches the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspacePath(PathBuf);

impl WorkspacePath {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self(path.into())
  }

  pub fn path(&self) -> &Path {
    &self.0
  }

  pub fn function_dir(&self, name: &str) -> PathBuf {
    self.0.join(name)
  }

  pub fn legacy_registry_path(&self) -> PathBuf {
    self.0.join(LEGACY_REGISTRY_FILENAME)
  }

  /// Immediate subdirectories, sorted by name.
  ///
  /// A missing workspace yields nothing.
  pub fn function_dirs(&self) -> Vec<PathBuf> {
    if !self.0.is_dir() {
      return Vec::new();
    }

    WalkDir::new(&self.0)
      .min_depth(1)
      .max_depth(1)
      .sort_by_file_name()
      .into_iter()
      .filter_map(|e| e.ok())
      .filter(|e| e.file_type().is_dir())
      .map(|e| e.into_path())
      .collect()
  }
}

impl fmt::Display for WorkspacePath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.display())
  }
}

pub fn manifest_path(function_dir: &Path) -> PathBuf {
  function_dir.join(MANIFEST_FILENAME)
}

pub fn event_path(function_dir: &Path) -> PathBuf {
  function_dir.join(EVENT_FILENAME)
}

/// True when `name` is a single plain path component, so the function
/// directory stays directly under the workspace.
pub fn is_valid_function_name(name: &str) -> bool {
  let mut components = Path::new(name).components();
  matches!(
    (components.next(), components.next()),
    (Some(Component::Normal(part)), None) if part == name
  )
}

/// Function name as stored on disk (the directory's last component).
pub fn function_name(function_dir: &Path) -> String {
  function_dir
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default()
}

/// Locations of a function's build outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
  pub build_dir: PathBuf,
  pub artifact: PathBuf,
  pub archive: PathBuf,
}

impl BuildPaths {
  /// Resolves the build directory from the template's `CodeUri`.
  ///
  /// A `CodeUri` naming an archive, or an absent one, means `<function>/build`.
  pub fn resolve(function_dir: &Path, code_uri: Option<&str>) -> Self {
    let build_dir = match code_uri.map(|u| u.trim().trim_end_matches('/')) {
      Some(uri) if !uri.is_empty() && uri != "." && !uri.ends_with(".zip") => function_dir.join(uri),
      _ => function_dir.join(BUILD_DIR),
    };

    Self {
      artifact: build_dir.join(ARTIFACT_NAME),
      archive: build_dir.join(ARCHIVE_NAME),
      build_dir,
    }
  }
}
