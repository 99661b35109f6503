use std::sync::Arc;

use tempfile::TempDir;

use shipwright_lib::toolchain::{Bootstrapper, ToolchainError, ToolchainSource};

use super::common::{archive_path_pattern, toolchain_archive, toolchain_settings, write_script};

#[tokio::test]
async fn second_run_reuses_the_cached_toolchain() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", archive_path_pattern())
    .with_body(toolchain_archive())
    .expect(1)
    .create_async()
    .await;
  let temp = TempDir::new().unwrap();
  let dir = temp.path().join("cache/toolchain");

  let first = Bootstrapper::new(toolchain_settings(&dir, temp.path(), &server.url()));
  let handle = first.ensure().await.unwrap();
  assert_eq!(handle.source, ToolchainSource::Installed);
  assert_eq!(handle.version_tag, "go1.23.3");
  assert_eq!(handle.executable_path, dir.join("bin/go1.23.3"));
  assert_eq!(first.fetch_count(), 1);

  let second = Bootstrapper::new(toolchain_settings(&dir, temp.path(), &server.url()));
  let handle = second.ensure().await.unwrap();
  assert_eq!(handle.source, ToolchainSource::Cached);
  assert_eq!(second.fetch_count(), 0);

  mock.assert_async().await;
}

#[tokio::test]
async fn concurrent_callers_share_one_bootstrap() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", archive_path_pattern())
    .with_body(toolchain_archive())
    .expect(1)
    .create_async()
    .await;
  let temp = TempDir::new().unwrap();
  let bootstrapper = Arc::new(Bootstrapper::new(toolchain_settings(
    &temp.path().join("toolchain"),
    temp.path(),
    &server.url(),
  )));

  let mut handles = Vec::new();
  for _ in 0..4 {
    let bootstrapper = Arc::clone(&bootstrapper);
    handles.push(tokio::spawn(async move { bootstrapper.ensure().await }));
  }
  for handle in handles {
    let toolchain = handle.await.unwrap().unwrap();
    assert_eq!(toolchain.version_tag, "go1.23.3");
  }

  assert_eq!(bootstrapper.fetch_count(), 1);
  mock.assert_async().await;
}

#[tokio::test]
async fn matching_host_toolchain_skips_installation() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", archive_path_pattern())
    .expect(0)
    .create_async()
    .await;
  let temp = TempDir::new().unwrap();
  let host = temp.path().join("host/go");
  write_script(&host, "echo 'go version go1.23.3 linux/amd64'");

  let mut settings = toolchain_settings(&temp.path().join("toolchain"), temp.path(), &server.url());
  settings.use_host = true;
  settings.host_executable = host.to_string_lossy().into_owned();

  let handle = Bootstrapper::new(settings).ensure().await.unwrap();

  assert_eq!(handle.source, ToolchainSource::Host);
  assert_eq!(handle.executable_path, host);
  assert!(!temp.path().join("toolchain").exists());
  mock.assert_async().await;
}

#[tokio::test]
async fn mismatched_host_toolchain_falls_back_to_project_install() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", archive_path_pattern())
    .with_body(toolchain_archive())
    .expect(1)
    .create_async()
    .await;
  let temp = TempDir::new().unwrap();
  let host = temp.path().join("host/go");
  write_script(&host, "echo 'go version go1.23.30 linux/amd64'");

  let mut settings = toolchain_settings(&temp.path().join("toolchain"), temp.path(), &server.url());
  settings.use_host = true;
  settings.host_executable = host.to_string_lossy().into_owned();

  let handle = Bootstrapper::new(settings).ensure().await.unwrap();

  assert_eq!(handle.source, ToolchainSource::Installed);
  mock.assert_async().await;
}

#[tokio::test]
async fn failed_download_leaves_nothing_cached() {
  let mut server = mockito::Server::new_async().await;
  let mock = server
    .mock("GET", archive_path_pattern())
    .with_status(404)
    .create_async()
    .await;
  let temp = TempDir::new().unwrap();
  let dir = temp.path().join("toolchain");

  let err = Bootstrapper::new(toolchain_settings(&dir, temp.path(), &server.url()))
    .ensure()
    .await
    .unwrap_err();

  assert!(matches!(err, ToolchainError::FetchFailed { .. }));
  assert!(!dir.join("bin/go1.23.3").exists());
  mock.assert_async().await;
}

#[tokio::test]
async fn archive_with_wrong_checksum_is_rejected() {
  let mut server = mockito::Server::new_async().await;
  server
    .mock("GET", archive_path_pattern())
    .with_body(toolchain_archive())
    .create_async()
    .await;
  let temp = TempDir::new().unwrap();

  let mut settings = toolchain_settings(&temp.path().join("toolchain"), temp.path(), &server.url());
  let bootstrapper = Bootstrapper::new(settings.clone());
  let name = bootstrapper
    .archive_url(settings.host.unwrap())
    .rsplit('/')
    .next()
    .unwrap()
    .to_string();
  settings.checksums.insert(name, "0".repeat(64));

  let err = Bootstrapper::new(settings).ensure().await.unwrap_err();

  assert!(matches!(err, ToolchainError::HashMismatch { .. }));
}
