use linkgraph::client::{ActionOptions, Client};
use linkgraph::config::ClientConfig;
use linkgraph::metadata::MetadataCapability;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::common::{TestServer, serve_um_api};

fn config(server: &TestServer) -> ClientConfig {
    let mut config = ClientConfig::default().with_endpoint("um", server.base());
    config.headers.insert("Affiliation-Id".to_string(), "acme".to_string());
    config
}

fn options() -> ActionOptions {
    ActionOptions::default().param("organization_id", 9).schema("first_name, organization { name }")
}

#[tokio::test]
async fn test_action_resolves_over_http() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    let client = Client::new(config(&server)).unwrap();

    let result = client.action("um.user", "query", options()).await.unwrap();

    assert_eq!(result.objects.len(), 2);
    for user in &result.objects {
        assert_eq!(user["organization"]["name"], json!("Acme"));
        assert!(user.get("organization_id").is_none());
        assert_eq!(
            user["@associations"]["organization"],
            json!(server.url("/v20140601/organizations/9"))
        );
    }
    assert_eq!(result.objects[0]["first_name"], json!("Ada"));

    let queries = server.requests_to("/v20140601/users");
    assert_eq!(queries.len(), 1);
    assert!(queries[0].target.contains("organization_id=9"));
    assert!(queries[0].target.contains("t="));
    assert_eq!(queries[0].headers["affiliation-id"], "acme");
    assert_eq!(queries[0].headers["accept"], "application/json");

    assert_eq!(server.requests_to("/v20140601/organizations/9").len(), 1);
    assert_eq!(server.requests_to("/v20140601/context/user").len(), 1);
    assert_eq!(server.requests_to("/v20140601/context/organization").len(), 1);
}

#[tokio::test]
async fn test_transient_failures_are_retried_then_nulled() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    server.route_status("GET", "/v20140601/organizations/9", 500, json!({"description": "database down"}));
    let client = Client::new(config(&server)).unwrap();

    let result = client.action("um.user", "query", options()).await.unwrap();

    assert_eq!(result.objects.len(), 2);
    assert_eq!(result.objects[0]["organization"], Value::Null);
    assert_eq!(result.objects[0]["first_name"], json!("Ada"));
    // one attempt plus the default two retries
    assert_eq!(server.requests_to("/v20140601/organizations/9").len(), 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    server.route_status("GET", "/v20140601/organizations/9", 404, json!({"description": "gone"}));
    let client = Client::new(config(&server)).unwrap();

    let result = client.action("um.user", "query", options()).await.unwrap();

    assert_eq!(result.objects[1]["organization"], Value::Null);
    assert_eq!(server.requests_to("/v20140601/organizations/9").len(), 1);
}

#[tokio::test]
async fn test_failed_top_level_call_is_an_error() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    server.route_status("GET", "/v20140601/users", 403, json!({"description": "forbidden"}));
    let client = Client::new(config(&server)).unwrap();

    let err = client.action("um.user", "query", options()).await.unwrap_err();

    assert_eq!(err.to_string(), "Network error: forbidden");
}

#[tokio::test]
async fn test_concurrent_metadata_lookups_share_one_request() {
    let server = TestServer::start().await.unwrap();
    serve_um_api(&server);
    let client = Client::new(config(&server)).unwrap();

    let (first, second) = tokio::join!(client.context("um.user"), client.context("um.user"));

    assert_eq!(first.unwrap().url(), second.unwrap().url());
    assert_eq!(server.requests_to("/v20140601/context/user").len(), 1);
}

#[tokio::test]
async fn test_unknown_app_is_a_config_error() {
    let client = Client::new(ClientConfig::default()).unwrap();
    let err = client.context("crm.contact").await.unwrap_err();
    assert!(err.to_string().contains("no endpoint configured for app 'crm'"));
}
