#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};

// Shared while any client holds it; the child is killed when the last one drops
static SERVER: Mutex<Weak<TestServer>> = Mutex::new(Weak::new());
static UNSCOPED_SERVER: Mutex<Weak<TestServer>> = Mutex::new(Weak::new());
static USER_SEQ: AtomicUsize = AtomicUsize::new(0);

pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(owner_scoping: bool) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory store keeps every test binary independent of a database
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_todo-api"));
        cmd.arg("serve")
            .env("APP_ENV", "development")
            .env("DATABASE_BACKEND", "memory")
            .env("SERVER_HOST", "127.0.0.1")
            .env("SERVER_PORT", port.to_string())
            .env("SECURITY_CSRF_ENABLED", "true")
            .env("SECURITY_OWNER_SCOPING", owner_scoping.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn shared_server(slot: &Mutex<Weak<TestServer>>, owner_scoping: bool) -> Result<Arc<TestServer>> {
    let mut slot = slot.lock().map_err(|_| anyhow::anyhow!("test server lock poisoned"))?;
    if let Some(server) = slot.upgrade() {
        return Ok(server);
    }
    let server = Arc::new(TestServer::spawn(owner_scoping)?);
    *slot = Arc::downgrade(&server);
    Ok(server)
}

/// Server with owner scoping on, as deployed
pub async fn ensure_server() -> Result<Arc<TestServer>> {
    let server = shared_server(&SERVER, true)?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Server where every user sees every list, so cross-user reads observe deletes
pub async fn ensure_unscoped_server() -> Result<Arc<TestServer>> {
    let server = shared_server(&UNSCOPED_SERVER, false)?;
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Username unique across every test in the process
pub fn unique_username(prefix: &str) -> String {
    let n = USER_SEQ.fetch_add(1, Ordering::SeqCst);
    format!("{}_{}_{}", prefix, std::process::id(), n)
}

/// Browser-like client: keeps cookies and echoes the CSRF token on
/// unsafe requests the way a SPA would.
pub struct TestClient {
    pub base_url: String,
    http: reqwest::Client,
    _server: Arc<TestServer>,
}

impl TestClient {
    pub async fn new() -> Result<Self> {
        Self::connect(ensure_server().await?)
    }

    pub async fn new_unscoped() -> Result<Self> {
        Self::connect(ensure_unscoped_server().await?)
    }

    fn connect(server: Arc<TestServer>) -> Result<Self> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            base_url: server.base_url.clone(),
            http,
            _server: server,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn csrf_token(&self) -> Result<String> {
        let body: Value = self.http.get(self.url("/set-csrf-token")).send().await?.json().await?;
        body["csrftoken"]
            .as_str()
            .map(str::to_string)
            .context("csrftoken missing from response")
    }

    /// Request without the CSRF header
    pub fn raw(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path))
    }

    pub async fn get(&self, path: &str) -> Result<Response> {
        Ok(self.http.get(self.url(path)).send().await?)
    }

    /// Unsafe request carrying a fresh CSRF token
    pub async fn send(&self, method: Method, path: &str, body: Option<Value>) -> Result<Response> {
        let token = self.csrf_token().await?;
        let mut request = self.http.request(method, self.url(path)).header("X-CSRFToken", token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        Ok(request.send().await?)
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Response> {
        self.send(Method::POST, path, Some(body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Response> {
        self.send(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Response> {
        self.send(Method::DELETE, path, None).await
    }

    pub async fn register(&self, username: &str) -> Result<Response> {
        self.post(
            "/register",
            json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": PASSWORD
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Response> {
        self.post("/login", json!({"username": username, "password": password})).await
    }

    /// Fresh client logged in as a newly registered user. Returns the user id.
    pub async fn signed_in(prefix: &str) -> Result<(Self, i64)> {
        Self::sign_in(Self::new().await?, prefix).await
    }

    /// Like `signed_in`, on the server without owner scoping
    pub async fn signed_in_unscoped(prefix: &str) -> Result<(Self, i64)> {
        Self::sign_in(Self::new_unscoped().await?, prefix).await
    }

    async fn sign_in(client: Self, prefix: &str) -> Result<(Self, i64)> {
        let username = unique_username(prefix);
        let res = client.register(&username).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "register failed: {}", res.status());

        let res = client.login(&username, PASSWORD).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        let body: Value = res.json().await?;
        let id = body["id"].as_i64().context("login response missing id")?;
        Ok((client, id))
    }

    pub async fn create_list(&self, name: &str) -> Result<Value> {
        let res = self.post("/todo-list/", json!({"name": name, "description": "things"})).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "create list failed: {}", res.status());
        Ok(res.json().await?)
    }

    pub async fn create_todo(&self, list_id: i64, title: &str) -> Result<Value> {
        let res = self.post("/todo/", json!({"title": title, "todo_list": list_id})).await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "create todo failed: {}", res.status());
        Ok(res.json().await?)
    }
}
