//! Shared helpers for the integration suite.
//!
//! [`TestServer`] is a minimal HTTP/1.1 server on a random local port. It
//! answers registered `(method, path)` routes with JSON and records every
//! request it receives, so tests can run the real reqwest-backed client and the
//! `linkgraph` binary against it.

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// One request received by [`TestServer`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query
    pub target: String,
    /// Header names are lower-cased
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn path(&self) -> &str {
        self.target.split('?').next().unwrap_or(&self.target)
    }
}

type Routes = HashMap<(String, String), (u16, Value)>;

#[derive(Default)]
struct State {
    routes: Mutex<Routes>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct TestServer {
    base: String,
    state: Arc<State>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind to a random port and start serving.
    pub async fn start() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.context("Failed to bind test server")?;
        let base = format!("http://{}", listener.local_addr()?);
        let state = Arc::new(State::default());

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, &state).await;
                });
            }
        });

        Ok(Self {
            base,
            state,
            handle,
        })
    }

    /// `http://127.0.0.1:<port>`
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Absolute URL of `path`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Answer `method path` with `200` and `body`.
    pub fn route(&self, method: &str, path: &str, body: Value) {
        self.route_status(method, path, 200, body);
    }

    /// Answer `method path` with `status` and `body`.
    pub fn route_status(&self, method: &str, path: &str, status: u16, body: Value) {
        self.state
            .routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((method.to_string(), path.to_string()), (status, body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Requests received for `path`, ignoring the query.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|request| request.path() == path).collect()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(stream: TcpStream, state: &State) -> Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = BTreeMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length = headers.get("content-length").and_then(|value| value.parse::<usize>().ok()).unwrap_or(0);
    let mut body = vec![0; length];
    reader.read_exact(&mut body).await?;

    let request = RecordedRequest {
        method,
        target,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    };
    let (status, response) = state
        .routes
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&(request.method.clone(), request.path().to_string()))
        .cloned()
        .unwrap_or_else(|| (404, json!({"description": format!("no route for {}", request.path())})));
    state.requests.lock().unwrap_or_else(PoisonError::into_inner).push(request);

    let payload = response.to_string();
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let mut stream = reader.into_inner();
    stream
        .write_all(
            format!(
                "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                payload.len()
            )
            .as_bytes(),
        )
        .await?;
    stream.shutdown().await?;
    Ok(())
}

/// Write a config file pointing app `um` at `endpoint`.
pub fn write_config(dir: &Path, endpoint: &str) -> Result<PathBuf> {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!("max_retries = 0\n\n[endpoints]\num = \"{endpoint}\"\n\n[headers]\n\"Affiliation-Id\" = \"acme\"\n"),
    )?;
    Ok(path)
}

/// Register a linked `um` API on `server`: users belonging to organization 9.
pub fn serve_um_api(server: &TestServer) {
    let api = server.url("/v20140601");
    let user_context = format!("{api}/context/user");
    let organization_context = format!("{api}/context/organization");

    server.route(
        "GET",
        "/v20140601/context/user",
        json!({
            "@context": {
                "properties": {
                    "id": {"type": "integer"},
                    "first_name": {"type": "string"},
                    "organization_id": {"type": "integer"},
                    "organization": {"type": organization_context}
                },
                "member_actions": {},
                "collection_actions": {
                    "query": {
                        "method": "GET",
                        "template": format!("{api}/users{{?organization_id}}"),
                        "mappings": [{"source": "organization_id", "variable": "organization_id"}]
                    }
                }
            }
        }),
    );
    server.route(
        "GET",
        "/v20140601/context/organization",
        json!({
            "@context": {
                "properties": {"id": {"type": "integer"}, "name": {"type": "string"}},
                "member_actions": {},
                "collection_actions": {
                    "get": {
                        "method": "GET",
                        "template": format!("{api}/organizations/{{organization_ids}}"),
                        "mappings": [{"source": "id", "variable": "organization_ids", "required": true}]
                    }
                }
            }
        }),
    );

    let user = |id: u64, name: &str| {
        json!({
            "@context": user_context,
            "@id": format!("{api}/users/{id}"),
            "@type": "user",
            "id": id,
            "first_name": name,
            "organization_id": 9,
            "organization": {"@id": format!("{api}/organizations/9"), "name": "stale"}
        })
    };
    server.route("GET", "/v20140601/users", json!({"members": [user(1, "Ada"), user(2, "Grace")]}));
    server.route(
        "GET",
        "/v20140601/organizations/9",
        json!({
            "@context": organization_context,
            "@id": format!("{api}/organizations/9"),
            "@type": "organization",
            "id": 9,
            "name": "Acme"
        }),
    );
}
