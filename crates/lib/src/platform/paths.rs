use crate::consts::APP_NAME;
use std::path::PathBuf;

/// Env var overriding the function workspace location.
pub const WORKSPACE_ENV: &str = "LAMINA_WORKSPACE";

/// Returns the user's home directory
#[cfg(windows)]
pub fn home_dir() -> PathBuf {
  std::env::var("USERPROFILE").map(PathBuf::from).unwrap_or_default()
}

/// Returns the user's home directory
#[cfg(not(windows))]
pub fn home_dir() -> PathBuf {
  std::env::var("HOME").map(PathBuf::from).unwrap_or_default()
}

/// Returns the directory for data files for the application
#[cfg(windows)]
pub fn data_dir() -> PathBuf {
  std::env::var("APPDATA")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join("AppData").join("Roaming"))
    .join(APP_NAME)
}

/// Returns the directory for data files for the application
#[cfg(not(windows))]
pub fn data_dir() -> PathBuf {
  let data_home = std::env::var("XDG_DATA_HOME")
    .map(PathBuf::from)
    .unwrap_or_else(|_| home_dir().join(".local").join("share"));
  data_home.join(APP_NAME)
}

/// Returns the function workspace directory.
///
/// `LAMINA_WORKSPACE` wins over the data directory default.
pub fn workspace_dir() -> PathBuf {
  if let Ok(path) = std::env::var(WORKSPACE_ENV)
    && !path.is_empty()
  {
    return PathBuf::from(path);
  }
  data_dir().join("functions")
}
