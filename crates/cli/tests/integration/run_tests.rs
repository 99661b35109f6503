//! Run command integration tests. None of these reach a compiler.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn dump_version_writes_the_release_version() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["run", "dump-version", "--release-version", "9.9.9"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Release 9.9.9 (stable)"))
    .stdout(predicate::str::contains("Completed 1 task(s)"));

  assert_eq!(
    std::fs::read_to_string(env.path("build/version.dump")).unwrap(),
    "version=9.9.9"
  );
}

#[test]
fn version_override_is_read_from_environment() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["run", "dump-version"])
    .env("RELEASE_EXPLICIT", "9.9.9-alpha.2")
    .assert()
    .success();

  assert_eq!(
    std::fs::read_to_string(env.path("build/version.dump")).unwrap(),
    "version=9.9.9-alpha.2"
  );
}

#[test]
fn several_tasks_run_in_one_invocation() {
  let env = TestEnv::new();
  env.write_file("go.mod", "module example\n\nrequire (\n\tgithub.com/example/foo v1.0.0\n)\n");

  env
    .cmd()
    .args(["run", "dump-version", "regenerate-licenses"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Completed 2 task(s)"));

  assert!(env.path("build/version.dump").exists());
  assert_eq!(
    std::fs::read_to_string(env.path("licenses/licences.md")).unwrap(),
    "http://github.com/example/foo\n"
  );
}

#[test]
fn clean_removes_output_and_cache() {
  let env = TestEnv::new();
  env.write_file("build/linux-amd64/xl-blueprint", "binary");
  env.write_file(".shipwright/toolchain/go.tar.gz", "archive");

  env.cmd().args(["run", "clean"]).assert().success();

  assert!(!env.path("build").exists());
  assert!(!env.path(".shipwright").exists());
}

#[test]
fn unreachable_toolchain_fails_the_run() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["run", "bootstrap", "--release-version", "9.9.9"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Task bootstrap failed"))
    .stderr(predicate::str::contains("toolchain unavailable"));

  // Its dependency ran before the failure.
  assert!(env.path("build/version.dump").exists());
}

#[test]
fn failure_is_reported_in_json() {
  let env = TestEnv::new();

  let output = env
    .cmd()
    .args(["run", "bootstrap", "--release-version", "9.9.9", "-o", "json"])
    .output()
    .unwrap();
  assert_eq!(output.status.code(), Some(1));

  let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(summary["version"], "9.9.9");
  assert_eq!(summary["completed"], serde_json::json!(["dump-version"]));
  assert_eq!(summary["failed"]["task"], "bootstrap");
  assert!(summary["failed"]["target"].is_null());
}

#[test]
fn build_failure_skips_dependents() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["run", "build-linux-amd64", "--release-version", "9.9.9"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("Task bootstrap failed"))
    .stderr(predicate::str::contains("Skipped build-linux-amd64"));
}
