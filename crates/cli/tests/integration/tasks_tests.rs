//! Tasks command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn lists_tasks_with_dependencies() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("tasks")
    .assert()
    .success()
    .stdout(predicate::str::contains("bootstrap"))
    .stdout(predicate::str::contains("after dump-version"))
    .stdout(predicate::str::contains("publish-linux-arm64"))
    .stdout(predicate::str::contains("compress-linux-amd64"))
    .stdout(predicate::str::contains("compress-darwin").not());
}

#[test]
fn names_targets_without_compression() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("tasks")
    .assert()
    .success()
    .stdout(predicate::str::contains("Compression disabled for: darwin-amd64, darwin-arm64"));
}

#[test]
fn json_output_carries_dependencies() {
  let env = TestEnv::new();

  let output = env.cmd().args(["tasks", "-o", "json"]).output().unwrap();
  assert!(output.status.success());

  let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let build = listing["tasks"]
    .as_array()
    .unwrap()
    .iter()
    .find(|task| task["name"] == "build-linux-amd64")
    .unwrap();
  assert_eq!(
    build["dependencies"],
    serde_json::json!(["bootstrap", "install-tools", "fmt", "regenerate-licenses"])
  );
  assert_eq!(listing["compression_disabled"], serde_json::json!(["darwin-amd64", "darwin-arm64"]));
}
