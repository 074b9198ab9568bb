//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock collaborators injected, so the whole HTTP surface can be
//! exercised without Unpaywall or a repository.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use pass_download_core::{
    load_config_from_str, AcquisitionOrchestrator, Config, Downloader, LookupClient,
    RepositoryIngest,
    testing::{MockDownloader, MockLookupClient, MockRepository},
};
use pass_download_server::state::AppState;

/// Re-export fixtures for test convenience
pub use pass_download_core::testing::fixtures;

const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8091

[unpaywall]
email = "pass@example.org"

[repository]
dest = "http://fcrepo:8080/fcrepo/rest/files"
internal_base_url = "http://fcrepo:8080/fcrepo/rest"
external_base_url = "https://pass.example.org/fcrepo/rest"
username = "fedoraAdmin"
password = "moo"
"#;

/// Test fixture for API testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_lookup() {
///     let fixture = TestFixture::new();
///     fixture.lookup.set_manuscripts(fixtures::DOI, fixtures::manuscripts(&[fixtures::LOCATION])).await;
///
///     let response = fixture.get("/api/v1/lookup?doi=10.1234/abcd.5678").await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock lookup provider - configure resolved locations
    pub lookup: Arc<MockLookupClient>,
    /// Mock downloader - control content and failures
    pub downloader: Arc<MockDownloader>,
    /// Mock repository - inspect ingested binaries
    pub repository: Arc<MockRepository>,
    /// Orchestrator behind the router
    pub orchestrator: Arc<AcquisitionOrchestrator>,
}

impl TestFixture {
    /// Create a fixture with a generous pipeline timeout.
    pub fn new() -> Self {
        Self::with_pipeline_timeout(30)
    }

    /// Create a fixture whose pipelines time out after `secs` seconds.
    pub fn with_pipeline_timeout(secs: u64) -> Self {
        let lookup = Arc::new(MockLookupClient::new());
        let downloader = Arc::new(MockDownloader::new());
        let repository = Arc::new(MockRepository::new());

        let mut config: Config =
            load_config_from_str(TEST_CONFIG).expect("Failed to parse test config");
        config.acquisition = fixtures::acquisition_config(secs);

        let orchestrator = Arc::new(AcquisitionOrchestrator::new(
            config.acquisition.clone(),
            Arc::clone(&lookup) as Arc<dyn LookupClient>,
            Arc::clone(&downloader) as Arc<dyn Downloader>,
            Arc::clone(&repository) as Arc<dyn RepositoryIngest>,
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&lookup) as Arc<dyn LookupClient>,
            Arc::clone(&orchestrator),
        ));

        let router = pass_download_server::api::create_router(state);

        Self {
            router,
            lookup,
            downloader,
            repository,
            orchestrator,
        }
    }

    /// Register the fixture DOI with the given locations.
    pub async fn with_locations(self, locations: &[&str]) -> Self {
        self.lookup
            .set_manuscripts(fixtures::DOI, fixtures::manuscripts(locations))
            .await;
        self
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        self.request_raw("POST", path, body, "application/json").await
    }

    /// Send a POST request with custom content type (for testing wrong content types).
    pub async fn post_with_content_type(
        &self,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        self.request_raw("POST", path, body, content_type).await
    }

    /// Fetch a path and return the raw text body.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn request_raw(
        &self,
        method: &str,
        path: &str,
        body: &str,
        content_type: &str,
    ) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body.to_string()))
            .unwrap();

        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Response from a test request.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Value of a response header, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}

/// Helper to assert a JSON path equals expected value.
#[macro_export]
macro_rules! assert_json_path {
    ($json:expr, $path:expr, $expected:expr) => {
        let actual = &$json[$path];
        assert_eq!(
            actual, &$expected,
            "Path '{}' expected {:?}, got {:?}",
            $path, $expected, actual
        );
    };
}
