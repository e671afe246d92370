//! Deposit API integration tests.
//!
//! Run with: `cargo test -p pmcdep-api --test deposit_api_test`

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use pmcdep_api::{build_router, AppState};
use pmcdep_core::{Config, DepositError};
use pmcdep_services::DepositTransport;
use pmcdep_storage::FileFetcher;
use serde_json::json;

struct StubFetcher;

#[async_trait]
impl FileFetcher for StubFetcher {
    async fn fetch(&self, _url: &str, dest: &Path) -> Result<(), DepositError> {
        tokio::fs::write(dest, b"downloaded").await?;
        Ok(())
    }
}

struct RecordingTransport {
    uploads: Mutex<Vec<String>>,
}

#[async_trait]
impl DepositTransport for RecordingTransport {
    async fn upload(
        &self,
        _local: &Path,
        remote_dir: &str,
        remote_name: &str,
    ) -> Result<(), DepositError> {
        self.uploads
            .lock()
            .unwrap()
            .push(format!("{remote_dir}/{remote_name}"));
        Ok(())
    }
}

struct FailingTransport;

#[async_trait]
impl DepositTransport for FailingTransport {
    async fn upload(&self, _: &Path, _: &str, _: &str) -> Result<(), DepositError> {
        Err(DepositError::Upload("connection reset".to_string()))
    }
}

fn test_config(local_base: &Path) -> Config {
    Config {
        local_storage_path: local_base.to_path_buf(),
        ..Config::default()
    }
}

fn test_server(state: Arc<AppState>) -> TestServer {
    TestServer::new(build_router(state)).expect("Failed to create test server")
}

fn envelope(task_id: &str) -> serde_json::Value {
    json!({
        "message": {
            "attributes": {
                "manifest": {
                    "taskId": task_id,
                    "files": [{
                        "filename": "paper.pdf",
                        "type": "manuscript",
                        "label": "M1",
                        "storage": "bucket",
                        "path": "https://files.example.org/paper.pdf"
                    }],
                    "metadata": {
                        "title": "A Title",
                        "journal": {
                            "issn": "1234-5678",
                            "issnType": "print",
                            "title": "J Test"
                        },
                        "authors": [{
                            "fname": "Ada",
                            "lname": "Lovelace",
                            "email": "ada@example.org",
                            "contactType": "reviewer"
                        }],
                        "grants": [{ "funder": "hhmi" }]
                    }
                }
            }
        }
    })
}

#[tokio::test]
async fn liveness_endpoint_responds() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::with_components(
        test_config(tmp.path()),
        Arc::new(StubFetcher),
        Arc::new(RecordingTransport {
            uploads: Mutex::new(Vec::new()),
        }),
    );
    let server = test_server(state);

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn deposit_succeeds_with_201_and_receipt() {
    let tmp = tempfile::tempdir().unwrap();
    let transport = Arc::new(RecordingTransport {
        uploads: Mutex::new(Vec::new()),
    });
    let state = AppState::with_components(
        test_config(tmp.path()),
        Arc::new(StubFetcher),
        transport.clone(),
    );
    let server = test_server(state);

    let response = server.post("/").json(&envelope("api-ok")).await;
    assert_eq!(response.status_code(), 201);

    let receipt: serde_json::Value = response.json();
    assert_eq!(receipt["archive_name"], "api-ok.tar.gz");
    assert!(receipt["remote_dir"]
        .as_str()
        .unwrap()
        .starts_with("upload/"));

    let uploads = transport.uploads.lock().unwrap();
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].ends_with("/api-ok.tar.gz"));
}

#[tokio::test]
async fn malformed_envelope_is_422() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::with_components(
        test_config(tmp.path()),
        Arc::new(StubFetcher),
        Arc::new(FailingTransport),
    );
    let server = test_server(state);

    let response = server.post("/").json(&json!({ "not": "an envelope" })).await;
    assert_eq!(response.status_code(), 422);

    let body: serde_json::Value = response.json();
    assert!(body["errors"].as_array().is_some());
}

#[tokio::test]
async fn invalid_manifest_is_422_with_field_paths() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::with_components(
        test_config(tmp.path()),
        Arc::new(StubFetcher),
        Arc::new(FailingTransport),
    );
    let server = test_server(state);

    let mut payload = envelope("api-bad");
    payload["message"]["attributes"]["manifest"]["metadata"]["journal"]
        .as_object_mut()
        .unwrap()
        .remove("title");

    let response = server.post("/").json(&payload).await;
    assert_eq!(response.status_code(), 422);

    let body: serde_json::Value = response.json();
    let errors = body["errors"].as_array().unwrap();
    assert!(errors
        .iter()
        .any(|e| e.as_str().unwrap().contains("metadata - journal - title")));
}

#[tokio::test]
async fn upload_failure_is_400_and_workspace_is_gone() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::with_components(
        test_config(tmp.path()),
        Arc::new(StubFetcher),
        Arc::new(FailingTransport),
    );
    let server = test_server(state);

    let response = server.post("/").json(&envelope("api-fail")).await;
    assert_eq!(response.status_code(), 400);

    let body: serde_json::Value = response.json();
    let errors = body["errors"].as_array().unwrap();
    assert!(errors[0].as_str().unwrap().contains("connection reset"));

    let residue: Vec<_> = std::fs::read_dir(std::env::temp_dir())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|n| n.starts_with("pmc-deposit-api-fail-"))
        .collect();
    assert!(residue.is_empty(), "leftover scratch state: {residue:?}");
}
