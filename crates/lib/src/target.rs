//! The release target matrix.
//!
//! Every supported (os, arch) pair has exactly one record in [`TARGETS`]. The
//! order of the table is stable and drives task naming and scheduling order.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::platform::arch::Arch;
use crate::platform::os::Os;

/// One compilation destination with its packaging conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Target {
  pub os: Os,
  pub arch: Arch,
  /// Extension the artifact repository registers the binary under.
  pub release_extension: &'static str,
  /// Suffix of the compiled binary itself.
  pub binary_extension: &'static str,
  /// Whether a compression step is scheduled for this target.
  pub compression_supported: bool,
}

/// The static target matrix.
///
/// Both darwin targets have compression disabled: the compressor produces
/// binaries that crash with a segmentation fault on macOS Ventura and later.
pub const TARGETS: &[Target] = &[
  Target {
    os: Os::Darwin,
    arch: Arch::Amd64,
    release_extension: "bin",
    binary_extension: "",
    compression_supported: false,
  },
  Target {
    os: Os::Darwin,
    arch: Arch::Arm64,
    release_extension: "bin",
    binary_extension: "",
    compression_supported: false,
  },
  Target {
    os: Os::Linux,
    arch: Arch::Amd64,
    release_extension: "bin",
    binary_extension: "",
    compression_supported: true,
  },
  Target {
    os: Os::Linux,
    arch: Arch::Arm64,
    release_extension: "bin",
    binary_extension: "",
    compression_supported: true,
  },
  Target {
    os: Os::Windows,
    arch: Arch::Amd64,
    release_extension: "exe",
    binary_extension: ".exe",
    compression_supported: true,
  },
];

/// Returns the ordered sequence of supported targets.
pub fn targets() -> &'static [Target] {
  TARGETS
}

/// Look up a target by its string form (e.g. `linux-amd64`).
pub fn find(name: &str) -> Option<&'static Target> {
  TARGETS.iter().find(|t| t.to_string() == name)
}

/// Targets for which compression is explicitly disabled.
pub fn without_compression() -> impl Iterator<Item = &'static Target> {
  TARGETS.iter().filter(|t| !t.compression_supported)
}

impl Target {
  /// File name of the compiled binary, e.g. `tool.exe`.
  pub fn binary_file_name(&self, binary_name: &str) -> String {
    format!("{}{}", binary_name, self.binary_extension)
  }

  /// Target-keyed output path: `<output_dir>/<target>/<binary><ext>`.
  pub fn output_path(&self, output_dir: &Path, binary_name: &str) -> PathBuf {
    output_dir.join(self.to_string()).join(self.binary_file_name(binary_name))
  }
}

impl fmt::Display for Target {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.os, self.arch)
  }
}
