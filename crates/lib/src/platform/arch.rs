use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Instruction set a function is compiled for and deployed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
  #[default]
  #[serde(rename = "x86_64")]
  X86_64,
  #[serde(rename = "arm64")]
  Arm64,
}

impl Architecture {
  /// Returns the identifier used in templates (`Architectures: [arm64]`)
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Arm64 => "arm64",
    }
  }

  /// Returns the `GOARCH` value a build for this architecture uses
  pub fn goarch(&self) -> &'static str {
    match self {
      Self::X86_64 => "amd64",
      Self::Arm64 => "arm64",
    }
  }

  /// Parses a template or toolchain spelling, returning `None` when unrecognized
  pub fn from_tag(tag: &str) -> Option<Self> {
    match tag.trim().to_ascii_lowercase().as_str() {
      "x86_64" | "amd64" | "x86-64" => Some(Self::X86_64),
      "arm64" | "aarch64" => Some(Self::Arm64),
      _ => None,
    }
  }
}

impl fmt::Display for Architecture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for Architecture {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_tag(s).ok_or_else(|| format!("unknown architecture '{}' (expected x86_64 or arm64)", s))
  }
}
