//! Plan command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn default_plan_builds_every_target() {
  let env = TestEnv::new();

  env
    .cmd()
    .arg("plan")
    .assert()
    .success()
    .stdout(predicate::str::contains("Plan: build-all"))
    .stdout(predicate::str::contains("Wave 1: dump-version, regenerate-licenses"))
    .stdout(predicate::str::contains("Wave 2: bootstrap"))
    .stdout(predicate::str::contains("build-windows-amd64"))
    .stdout(predicate::str::contains("publish-").not());
}

#[test]
fn publish_all_ends_the_plan() {
  let env = TestEnv::new();

  let output = env
    .cmd()
    .args(["plan", "publish-all", "--output", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let plan: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let waves = plan["waves"].as_array().unwrap();
  assert_eq!(waves.last().unwrap(), &serde_json::json!(["publish-all"]));
  assert!(!waves.iter().flat_map(|wave| wave.as_array().unwrap()).any(|task| task.as_str().unwrap().starts_with("compress-")));
}

#[test]
fn unknown_task_is_rejected() {
  let env = TestEnv::new();

  env
    .cmd()
    .args(["plan", "deploy-everything"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown task: deploy-everything"));
}

#[test]
fn config_flag_selects_project_root() {
  let env = TestEnv::new();
  let elsewhere = tempfile::TempDir::new().unwrap();

  env
    .cmd()
    .current_dir(elsewhere.path())
    .arg("--config")
    .arg(env.path("shipwright.toml"))
    .args(["plan", "clean"])
    .assert()
    .success()
    .stdout(predicate::str::contains("Wave 1: clean"));
}
