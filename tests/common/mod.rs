use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use formbase::config::{Config, Environment, Storage};
use formbase::store::{MemoryStore, SharedStore};

/// A running test server backed by an in-memory store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    #[allow(dead_code)]
    pub store: SharedStore,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn read(resp: reqwest::Response) -> (Value, StatusCode) {
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or(json!(null));
        (body, status)
    }

    pub async fn get(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("get request failed");
        Self::read(resp).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("post request failed");
        Self::read(resp).await
    }

    pub async fn put(&self, path: &str, body: &Value) -> (Value, StatusCode) {
        let resp = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("put request failed");
        Self::read(resp).await
    }

    pub async fn delete(&self, path: &str) -> (Value, StatusCode) {
        let resp = self
            .client
            .delete(self.url(path))
            .send()
            .await
            .expect("delete request failed");
        Self::read(resp).await
    }

    /// Submit a form and return the stored record.
    #[allow(dead_code)]
    pub async fn submit(&self, data: &Value) -> Value {
        let (body, status) = self.post("/forms", data).await;
        assert_eq!(status, StatusCode::CREATED, "submit failed: {body}");
        body["data"].clone()
    }
}

pub fn test_config(environment: Environment) -> Config {
    Config {
        storage: Storage::Memory,
        host: "127.0.0.1".parse().unwrap(),
        port: 0, // unused, we bind to random port
        environment,
        base_path: String::new(),
        max_body_size: 1_048_576,
        log_level: "warn".to_string(),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_with(Arc::new(MemoryStore::new()), test_config(Environment::Production)).await
}

/// Spawn the router on a random port with the given store and config.
pub async fn spawn_with(store: SharedStore, config: Config) -> TestApp {
    let app = formbase::build_app(store.clone(), config);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });

    TestApp {
        addr,
        client: Client::new(),
        store,
    }
}
