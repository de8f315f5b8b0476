//! Test helpers for integration tests
//!
//! Provides utilities for spawning in-process test servers and making HTTP
//! requests as a given caller.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use engage_api::{create_app_state, serve, AppState};
use engage_common::AppConfig;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Products seeded into the in-memory catalog
pub const SEED_PRODUCTS: usize = 60;

/// Header carrying the caller identity
pub const USER_HEADER: &str = "X-USER-ID";

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    /// Start a new test server on the memory backend
    pub async fn start() -> Result<Self> {
        Self::start_with_config(test_config(&[])?).await
    }

    /// Start a test server with custom config
    pub async fn start_with_config(config: AppConfig) -> Result<Self> {
        let state = create_app_state(config).await?;

        // Port 0 lets the OS pick a free port
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server_state = state.clone();
        let handle = tokio::spawn(async move {
            let shutdown = async {
                shutdown_rx.await.ok();
            };
            serve(server_state, listener, shutdown).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            state,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Application state shared with the running server
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Make a GET request without caller identity
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a GET request as a user
    pub async fn get_as(&self, path: &str, user_id: i64) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .get(&url)
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await?)
    }

    /// Make a POST request as a user
    pub async fn post_as(&self, path: &str, user_id: i64) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .post(&url)
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await?)
    }

    /// Make a PUT request as a user
    pub async fn put_as(&self, path: &str, user_id: i64) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .put(&url)
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await?)
    }

    /// Make a DELETE request as a user
    pub async fn delete_as(&self, path: &str, user_id: i64) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self
            .client
            .delete(&url)
            .header(USER_HEADER, user_id.to_string())
            .send()
            .await?)
    }

    /// Stop the server and wait for the reconciler to finish
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
        if let Some(handle) = self.handle.take() {
            handle.await.ok();
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            tx.send(()).ok();
        }
    }
}

/// Create a memory-backend test configuration, with overrides
pub fn test_config(overrides: &[(&str, &str)]) -> Result<AppConfig> {
    let seed = SEED_PRODUCTS.to_string();
    let mut vars: HashMap<String, String> = [
        ("APP_ENV", "development"),
        ("API_PORT", "0"),
        ("STORAGE_BACKEND", "memory"),
        ("MEMORY_SEED_PRODUCTS", seed.as_str()),
        ("RATE_LIMIT_REQUESTS_PER_SECOND", "1"),
        ("RATE_LIMIT_BURST", "100000"),
        // Tests drive reconciliation explicitly
        ("RECONCILE_INTERVAL_SECS", "3600"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (key, value) in overrides {
        vars.insert((*key).to_string(), (*value).to_string());
    }

    AppConfig::from_lookup(|key| vars.get(key).cloned())
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(response.json().await?)
}

/// Assert response status without parsing body
pub async fn assert_status(response: Response, expected_status: StatusCode) -> Result<()> {
    let status = response.status();
    if status != expected_status {
        let body = response.text().await?;
        anyhow::bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }
    Ok(())
}
