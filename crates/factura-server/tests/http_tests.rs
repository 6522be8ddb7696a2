//! HTTP surface tests for batch submission, driven through the feature
//! router with the in-memory store and scripted adapters.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use factura_server::adapters::mock::{ScriptedExtractor, ScriptedRates};
use factura_server::config::UploadConfig;
use factura_server::features::{self, FeatureState};
use factura_server::pipeline::PipelineOrchestrator;
use factura_server::progress::ProgressHub;
use factura_server::store::InMemoryJobStore;

const BOUNDARY: &str = "------------------------factura";

fn app(reports_dir: &std::path::Path, uploads: UploadConfig) -> Router {
    let store = Arc::new(InMemoryJobStore::new());
    let hub = Arc::new(ProgressHub::new());
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store.clone(),
        Arc::new(ScriptedExtractor::new()),
        Arc::new(ScriptedRates::new()),
        hub.clone(),
        reports_dir,
        Duration::from_secs(1),
    ));
    features::router(FeatureState {
        store,
        hub,
        orchestrator,
        uploads,
    })
}

fn uploads(max_file_bytes: usize) -> UploadConfig {
    UploadConfig {
        reports_dir: "reports".to_string(),
        max_file_bytes,
        max_batch_files: 50,
    }
}

fn multipart_body(target_currency: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; \
             name=\"target_currency\"\r\n\r\n{target_currency}\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; \
             filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn submit_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jobs")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_submission_inside_file_cap_is_accepted() {
    let reports_dir = tempfile::tempdir().unwrap();
    let app = app(reports_dir.path(), uploads(20 * 1024 * 1024));

    // Well past the framework's 2 MB default body limit, inside the cap.
    let body = multipart_body("USD", "invoice.pdf", &vec![0u8; 3 * 1024 * 1024]);
    let response = app.oneshot(submit_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_oversized_file_is_rejected_by_validation() {
    let reports_dir = tempfile::tempdir().unwrap();
    let app = app(reports_dir.path(), uploads(1024));

    let body = multipart_body("USD", "invoice.pdf", &vec![0u8; 2048]);
    let response = app.oneshot(submit_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let message = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(message.contains("exceeds"), "unexpected body: {message}");
}
