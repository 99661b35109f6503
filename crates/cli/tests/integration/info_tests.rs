//! Info command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn explicit_prerelease_version() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("info")
    .env("RELEASE_EXPLICIT", "9.9.9-alpha.1")
    .assert()
    .success()
    .stdout(predicate::str::contains("Version: 9.9.9-alpha.1"))
    .stdout(predicate::str::contains("Channel: pre-release"));
}

#[test]
fn derived_version_extends_base_version() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("info")
    .assert()
    .success()
    .stdout(predicate::str::contains("Version: 25.1.0-"))
    .stdout(predicate::str::contains("Channel: stable"));
}

#[test]
fn matrix_is_listed_in_order() {
  let env = TestEnv::new();

  let output = env.cmd().args(["info", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let info: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let targets: Vec<String> = info["targets"]
    .as_array()
    .unwrap()
    .iter()
    .map(|t| format!("{}-{}", t["os"].as_str().unwrap(), t["arch"].as_str().unwrap()))
    .collect();
  assert_eq!(
    targets,
    ["darwin-amd64", "darwin-arm64", "linux-amd64", "linux-arm64", "windows-amd64"]
  );
  assert_eq!(info["targets"][4]["release_extension"], "exe");
}
