use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::common::{TestServer, serve_um_api, write_config};

fn linkgraph() -> Command {
    let mut cmd = Command::cargo_bin("linkgraph").unwrap();
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

/// Run the binary off the async runtime so the test server keeps answering.
async fn run(config: PathBuf, args: &[&str]) -> std::process::Output {
    let args: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
    tokio::task::spawn_blocking(move || {
        linkgraph().arg("--config").arg(config).args(args).output().unwrap()
    })
    .await
    .unwrap()
}

#[test]
fn test_help() {
    linkgraph()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("context"))
        .stdout(predicate::str::contains("action"));
}

#[test]
fn test_missing_endpoint() {
    let temp = TempDir::new().unwrap();

    linkgraph()
        .arg("--config")
        .arg(temp.path().join("missing.toml"))
        .args(["context", "um.user"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no endpoint configured for app 'um'"))
        .stderr(predicate::str::contains("[endpoints]"));
}

#[test]
fn test_invalid_config() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.toml");
    std::fs::write(&path, "[endpoints\num = 1").unwrap();

    linkgraph()
        .arg("--config")
        .arg(&path)
        .args(["context", "um.user"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_invalid_body() {
    let temp = TempDir::new().unwrap();
    let path = write_config(temp.path(), "http://127.0.0.1:9").unwrap();

    linkgraph()
        .arg("--config")
        .arg(&path)
        .args(["action", "um.user", "query", "--body", "{not json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_context_command() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), server.base()).unwrap();

    let output = run(config, &["context", "um.user"]).await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("(linked)"));
    assert!(stdout.contains(&format!(
        "organization -> {} [one]",
        server.url("/v20140601/context/organization")
    )));
    assert!(stdout.contains("collection.query: GET"));

    let requests = server.requests_to("/v20140601/context/user");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].headers["affiliation-id"], "acme");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_action_command() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), server.base()).unwrap();

    let output = run(
        config,
        &["action", "um.user", "query", "-p", "organization_id=9", "--schema", "first_name, organization { name }"],
    )
    .await;

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let rendered: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let users = rendered["objects"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["first_name"], "Ada");
    assert_eq!(users[1]["organization"]["name"], "Acme");
    assert!(users[0].get("organization_id").is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_action_command_raw() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path(), server.base()).unwrap();

    let output = run(config, &["action", "um.user", "query", "--schema", "organization", "--raw"]).await;

    assert!(output.status.success());
    let rendered: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rendered["objects"][0]["organization"], serde_json::Value::Null);
    assert_eq!(rendered["objects"][0]["organization_id"], 9);
    assert!(server.requests_to("/v20140601/organizations/9").is_empty());
}
