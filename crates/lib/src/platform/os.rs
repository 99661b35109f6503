use std::fmt;

use serde::Serialize;

/// Operating systems a release can be compiled for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
  Darwin,
  Linux,
  Windows,
}

impl Os {
  /// Detect the current operating system at runtime
  pub fn current() -> Option<Self> {
    match std::env::consts::OS {
      "linux" => Some(Self::Linux),
      "macos" => Some(Self::Darwin),
      "windows" => Some(Self::Windows),
      _ => None,
    }
  }

  /// Returns the identifier the compiler uses for this OS (`GOOS`)
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Darwin => "darwin",
      Self::Linux => "linux",
      Self::Windows => "windows",
    }
  }

  /// Archive format the toolchain vendor ships for this OS
  pub fn archive_kind(&self) -> ArchiveKind {
    match self {
      Self::Windows => ArchiveKind::Zip,
      Self::Darwin | Self::Linux => ArchiveKind::TarGz,
    }
  }

  /// Suffix of executables on this OS
  pub fn exe_suffix(&self) -> &'static str {
    match self {
      Self::Windows => ".exe",
      Self::Darwin | Self::Linux => "",
    }
  }
}

impl fmt::Display for Os {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// Packaging of a downloadable toolchain archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
  TarGz,
  Zip,
}

impl ArchiveKind {
  pub fn extension(&self) -> &'static str {
    match self {
      Self::TarGz => "tar.gz",
      Self::Zip => "zip",
    }
  }
}

impl fmt::Display for ArchiveKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.extension())
  }
}
