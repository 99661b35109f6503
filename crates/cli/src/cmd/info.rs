use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use shipwright_lib::platform::Platform;
use shipwright_lib::provenance::{self, Channel};
use shipwright_lib::target::{self, Target};

use super::load_project;
use crate::output::{OutputFormat, print_json};

#[derive(Debug, Serialize)]
struct InfoOutput {
  platform: Option<String>,
  /// Matrix entry matching the host, if any.
  host_target: Option<String>,
  version: String,
  channel: Channel,
  targets: &'static [Target],
}

pub fn cmd_info(config: &Path, release_version: Option<&str>, output: OutputFormat) -> Result<()> {
  let (project, _) = load_project(config)?;
  let version = provenance::current_version(&project.project.base_version, release_version);
  let host = Platform::current();
  let info = InfoOutput {
    platform: host.map(|p| p.to_string()),
    host_target: host.and_then(|p| p.as_target()).map(ToString::to_string),
    channel: Channel::classify(&version, &project.project.prerelease_markers),
    version,
    targets: target::targets(),
  };

  if output.is_json() {
    return print_json(&info);
  }

  println!("System:");
  match &info.platform {
    Some(triple) => println!("  Platform: {}", triple),
    None => println!("  Could not detect platform."),
  }
  println!("Release:");
  println!("  Version: {}", info.version);
  println!("  Channel: {}", info.channel);
  println!("Targets:");
  for t in info.targets {
    let name = t.to_string();
    let marker = if info.host_target.as_deref() == Some(name.as_str()) { "*" } else { " " };
    let compression = if t.compression_supported { "compressed" } else { "uncompressed" };
    println!("{} {:<16} .{:<4} {}", marker, name, t.release_extension, compression);
  }
  Ok(())
}
