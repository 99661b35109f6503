//! Host detection and the naming shared by the host and the target matrix.

pub mod arch;
pub mod os;
pub mod paths;

use std::fmt;

use arch::Arch;
use os::Os;

use crate::target::{self, Target};

/// The machine a run executes on, named the way the matrix names targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
  pub os: Os,
  pub arch: Arch,
}

impl Platform {
  pub fn new(os: Os, arch: Arch) -> Self {
    Self { os, arch }
  }

  /// `None` when the host OS or architecture has no toolchain download.
  pub fn current() -> Option<Self> {
    Some(Self::new(Os::current()?, Arch::current()?))
  }

  /// The matrix entry compiled for this platform, if any.
  pub fn as_target(&self) -> Option<&'static Target> {
    target::targets()
      .iter()
      .find(|t| t.os == self.os && t.arch == self.arch)
  }
}

impl fmt::Display for Platform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.os, self.arch)
  }
}
