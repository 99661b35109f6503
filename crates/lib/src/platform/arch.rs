use std::fmt;

use serde::Serialize;

/// CPU architectures a release can be compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
  Amd64,
  Arm64,
}

impl Arch {
  /// Detect the current CPU architecture at runtime
  pub fn current() -> Option<Self> {
    Self::from_host_name(std::env::consts::ARCH)
  }

  /// Map the names hosts report for an architecture onto the matrix naming
  pub fn from_host_name(name: &str) -> Option<Self> {
    match name {
      "x86_64" | "x64" | "amd64" => Some(Self::Amd64),
      "aarch64" | "arm64" => Some(Self::Arm64),
      _ => None,
    }
  }

  /// Returns the identifier the compiler uses for this architecture (`GOARCH`)
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Amd64 => "amd64",
      Self::Arm64 => "arm64",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
