//! Shared helpers: a scripted toolchain archive and a release project.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use tempfile::TempDir;

use shipwright_lib::config::{ProjectConfig, ProjectPaths, RunOptions};
use shipwright_lib::context::{Backends, RunContext};
use shipwright_lib::platform::Platform;
use shipwright_lib::provenance::{ProvenanceError, Vcs};
use shipwright_lib::publish::{LocalObjectStore, LocalRepository};
use shipwright_lib::toolchain::ToolchainSettings;

pub const PINNED_VERSION: &str = "1.23.3";

/// Entry point of the unpacked archive. Only knows how to install the
/// version wrapper.
const INITIAL_GO: &str = r#"#!/bin/sh
here="$(cd "$(dirname "$0")/.." && pwd)"
case "$1" in
  version) echo "go version go1.21.0 fake/fake" ;;
  install)
    mkdir -p "$GOPATH/bin"
    cp "$here/pinned.sh" "$GOPATH/bin/go1.23.3"
    chmod +x "$GOPATH/bin/go1.23.3"
    ;;
  *) echo "unsupported: $*" >&2; exit 1 ;;
esac
"#;

/// The version wrapper. `build` records its target and arguments into the
/// `-o` file; a `fail-<os>-<arch>` marker in the working directory makes
/// that target's build fail after the others have had time to finish.
const PINNED_GO: &str = r#"#!/bin/sh
case "$1" in
  version) echo "go version go1.23.3 fake/fake" ;;
  download) mkdir -p "$HOME/sdk/go1.23.3" ;;
  env) echo "$HOME/sdk/go1.23.3" ;;
  build)
    if [ -f "fail-$GOOS-$GOARCH" ]; then
      sleep 1
      echo "undefined: main.missing" >&2
      exit 2
    fi
    out=""
    prev=""
    for arg in "$@"; do
      if [ "$prev" = "-o" ]; then out="$arg"; fi
      prev="$arg"
    done
    mkdir -p "$(dirname "$out")"
    printf '%s\n' "$GOOS/$GOARCH" "$@" > "$out"
    ;;
  *) ;;
esac
"#;

/// A gzipped tarball laid out like the vendor's toolchain archive.
pub fn toolchain_archive() -> Vec<u8> {
  let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
  for (path, content) in [("go/bin/go", INITIAL_GO), ("go/pinned.sh", PINNED_GO)] {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, path, content.as_bytes()).unwrap();
  }
  builder.into_inner().unwrap().finish().unwrap()
}

/// Path pattern matching the archive URL for any host.
pub fn archive_path_pattern() -> mockito::Matcher {
  mockito::Matcher::Regex(r"^/go1\.23\.3\.[a-z]+-[a-z0-9]+\.tar\.gz$".to_string())
}

pub fn write_script(path: &Path, body: &str) {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
  std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn toolchain_settings(dir: &Path, workdir: &Path, dist_url: &str) -> ToolchainSettings {
  ToolchainSettings {
    version: PINNED_VERSION.to_string(),
    dist_url: dist_url.to_string(),
    installer: "golang.org/dl".to_string(),
    dir: dir.to_path_buf(),
    workdir: workdir.to_path_buf(),
    checksums: Default::default(),
    use_host: false,
    host: Platform::current(),
    host_executable: "go".to_string(),
  }
}

/// Version control with fixed answers.
pub struct FixedVcs;

#[async_trait]
impl Vcs for FixedVcs {
  async fn head_commit(&self, _root: &Path) -> Result<String, ProvenanceError> {
    Ok("fedcba9876543210".to_string())
  }

  async fn describe(&self, _root: &Path) -> Result<String, ProvenanceError> {
    Ok("blueprint-cli-25.1.0-7-gfedcba9".to_string())
  }
}

const GO_MOD: &str = "module github.com/example/blueprint-cli

go 1.23

require (
\tgithub.com/example/foo v1.2.3
\tgolang.org/x/sys v0.20.0 // indirect
)
";

/// A project directory with a `shipwright.toml`, a `go.mod`, and a fake
/// compressor.
pub struct Project {
  pub temp: TempDir,
}

impl Project {
  pub fn new(dist_url: &str, compress_before_publish: bool) -> Self {
    let temp = TempDir::new().unwrap();
    let root = temp.path();
    let compressor = root.join("tools/fake-upx");
    write_script(&compressor, "printf 'packed\\n' >> \"$1\"");

    let config = format!(
      r#"[project]
binary_name = "xl-blueprint"
artifact_name = "blueprint-cli"
package_path = "github.com/example/blueprint-cli"
main_path = "cmd/blueprint"
base_version = "25.1.0"
group = "com.example.cli"

[toolchain]
dist_url = "{dist_url}"

[build]
compressor = "{compressor}"
compress_before_publish = {compress_before_publish}

[publish]
local_dir = "store"
local_repository = "m2"
"#,
      compressor = compressor.display()
    );
    std::fs::write(root.join("shipwright.toml"), config).unwrap();
    std::fs::write(root.join("go.mod"), GO_MOD).unwrap();

    Self { temp }
  }

  pub fn root(&self) -> &Path {
    self.temp.path()
  }

  pub fn path(&self, relative: &str) -> PathBuf {
    self.root().join(relative)
  }

  /// Make the build for `target` fail.
  pub fn break_target(&self, target: &str) {
    std::fs::write(self.path(&format!("fail-{target}")), "").unwrap();
  }

  /// A context publishing into local directories under the project.
  pub fn context(&self, options: RunOptions) -> Arc<RunContext> {
    let config = ProjectConfig::load(&self.path("shipwright.toml")).unwrap();
    let paths = ProjectPaths::new(self.root(), &config);
    let backends = Backends {
      vcs: Arc::new(FixedVcs),
      store: Arc::new(LocalObjectStore::new(&paths.local_object_store)),
      repository: Arc::new(LocalRepository::new(paths.local_repository.clone().unwrap())),
    };
    Arc::new(RunContext::new(config, paths, options, backends).unwrap())
  }
}
