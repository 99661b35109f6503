//! External process invocation.
//!
//! Every suspension point of a run (toolchain installation, compiler
//! invocation, compression, version-control queries) is a child process. The
//! calling task blocks on the process until it exits; there is no timeout.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors raised while running an external command.
#[derive(Debug, Error)]
pub enum CommandError {
  /// The program could not be started at all.
  #[error("failed to spawn {program}: {source}")]
  Spawn {
    program: String,
    #[source]
    source: std::io::Error,
  },

  /// The program ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}{}", stderr_suffix(.stderr))]
  Failed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// Lines of stderr carried into an error message.
const STDERR_TAIL_LINES: usize = 20;

/// The tail of a failed command's stderr, on its own lines.
fn stderr_suffix(stderr: &str) -> String {
  if stderr.is_empty() {
    return String::new();
  }
  let lines: Vec<&str> = stderr.lines().collect();
  let tail = &lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..];
  format!("\n{}", tail.join("\n"))
}

/// Run `program` with `args` in `cwd`, adding `env` on top of the inherited
/// environment.
///
/// Returns trimmed stdout on success.
pub async fn execute(
  program: impl AsRef<OsStr>,
  args: &[String],
  env: &BTreeMap<String, String>,
  cwd: &Path,
) -> Result<String, CommandError> {
  let program = program.as_ref();
  let cmd = render(program, args);
  debug!(cmd = %cmd, cwd = ?cwd, "executing command");

  let output = Command::new(program)
    .args(args)
    .envs(env)
    .current_dir(cwd)
    .stdin(Stdio::null())
    .output()
    .await
    .map_err(|source| CommandError::Spawn {
      program: program.to_string_lossy().into_owned(),
      source,
    })?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(CommandError::Failed {
      cmd,
      code: output.status.code(),
      stderr,
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Run a probe command, reporting only whether it exited successfully.
pub async fn succeeds(program: impl AsRef<OsStr>, args: &[String], cwd: &Path) -> bool {
  execute(program, args, &BTreeMap::new(), cwd).await.is_ok()
}

/// Human-readable form of a command line for logs and errors.
fn render(program: &OsStr, args: &[String]) -> String {
  let mut parts = vec![program.to_string_lossy().into_owned()];
  parts.extend(args.iter().cloned());
  parts.join(" ")
}

/// Shorthand for building an argument list from string slices.
pub fn args<I, S>(items: I) -> Vec<String>
where
  I: IntoIterator<Item = S>,
  S: Into<String>,
{
  items.into_iter().map(Into::into).collect()
}
