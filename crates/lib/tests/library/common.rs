use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use lamina_lib::manifest::ManifestStore;
use lamina_lib::registry::FunctionRegistry;
use lamina_lib::workspace::WorkspacePath;
use tempfile::TempDir;

/// A scratch workspace plus a sibling directory for source files.
pub struct Fixture {
  pub temp: TempDir,
  pub registry: FunctionRegistry,
}

impl Fixture {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("workspace")).unwrap();
    fs::create_dir_all(temp.path().join("src")).unwrap();
    let workspace = WorkspacePath::new(temp.path().join("workspace"));
    let registry = FunctionRegistry::new(workspace, ManifestStore::default());
    Self { temp, registry }
  }

  pub fn workspace(&self) -> &Path {
    self.registry.workspace().path()
  }

  /// Create `src/<relative>` with a trivial body and return its canonical path.
  pub fn source(&self, relative: &str) -> PathBuf {
    let path = self.temp.path().join("src").join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "package main\n\nfunc main() {}\n").unwrap();
    dunce::canonicalize(path).unwrap()
  }

  /// Write a manifest straight into `<workspace>/<name>/template.yaml`.
  pub fn raw_manifest(&self, name: &str, yaml: &str) -> PathBuf {
    let dir = self.workspace().join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("template.yaml"), yaml).unwrap();
    dir
  }
}

/// Write `content` to `path` and pin its modification time `secs_ago` in the past.
pub fn write_aged(path: &Path, content: &str, secs_ago: u64) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, content).unwrap();
  set_age(path, secs_ago);
}

pub fn set_age(path: &Path, secs_ago: u64) {
  let file = fs::File::options().write(true).open(path).unwrap();
  file
    .set_modified(SystemTime::now() - Duration::from_secs(secs_ago))
    .unwrap();
}
