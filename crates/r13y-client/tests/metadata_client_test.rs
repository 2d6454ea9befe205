//! Contract tests for MetadataClient against a mocked metadata service.
//!
//! ## Endpoints Tested
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | GET    | `/narinfo/{artifact}` | `narinfo_*`, `resolve_*` |
//! | GET    | `/` | `health_check_*` |

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use r13y_client::{ClientConfig, ClientError, MetadataClient};
use r13y_core::ArtifactRef;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTIFACT_HEX: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

fn artifact() -> ArtifactRef {
    ArtifactRef::from_hex(ARTIFACT_HEX).unwrap()
}

fn test_client(mock_server: &MockServer) -> MetadataClient {
    let config = ClientConfig::new(mock_server.uri().parse().unwrap());
    MetadataClient::new(config).unwrap()
}

// ── GET /narinfo/{artifact} ──────────────────────────────────────────

#[tokio::test]
async fn narinfo_sends_correct_path_and_parses_document() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "storePath": "/nix/store/0c7bvpyc3lcs2y1x0ly4mqsrnmc8ss5g-hello-2.12.1",
            "narHash": "sha256:1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s",
            "narSize": 226560,
            "references": []
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let info = client.narinfo(&artifact()).await.unwrap();
    assert_eq!(
        info.store_path,
        "/nix/store/0c7bvpyc3lcs2y1x0ly4mqsrnmc8ss5g-hello-2.12.1"
    );
    assert_eq!(info.nar_size, Some(226560));
}

#[tokio::test]
async fn resolve_derives_descriptor() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "storePath": "/nix/store/0c7bvpyc3lcs2y1x0ly4mqsrnmc8ss5g-hello-2.12.1",
            "narHash": "sha256:1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let descriptor = client.resolve(&artifact()).await.unwrap();
    assert_eq!(descriptor.name_prefix(), "0c7bvpyc3lcs2y1x0ly4mqsrnmc8ss5g");
    assert_eq!(
        descriptor.nar_url("https://cache.example.org"),
        "https://cache.example.org/nar/0c7bvpyc3lcs2y1x0ly4mqsrnmc8ss5g/1b8m03r63zqhnjf7l5wnldhh7c134ap5vpj0850ymkq1iyzicy5s"
    );
}

#[tokio::test]
async fn narinfo_handles_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such output"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    match client.narinfo(&artifact()).await.unwrap_err() {
        ClientError::ApiError { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such output");
        }
        other => panic!("expected ApiError, got: {other:?}"),
    }
}

#[tokio::test]
async fn resolve_rejects_document_without_store_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "narHash": "sha256:abc"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.resolve(&artifact()).await.unwrap_err();
    assert!(
        matches!(err, ClientError::Deserialization { .. }),
        "got: {err:?}"
    );
}

#[tokio::test]
async fn resolve_rejects_unusable_nar_hash() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "storePath": "/nix/store/abc-hello",
            "narHash": "sha256:"
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    let err = client.resolve(&artifact()).await.unwrap_err();
    assert!(matches!(err, ClientError::Malformed { .. }), "got: {err:?}");
}

#[tokio::test]
async fn bearer_token_is_sent_when_configured() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .and(header("authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "storePath": "/nix/store/abc-hello",
            "narHash": "sha256:abc"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = ClientConfig::new(mock_server.uri().parse().unwrap());
    config.api_token = Some(zeroize::Zeroizing::new("s3cret".to_string()));
    let client = MetadataClient::new(config).unwrap();
    assert!(client.resolve(&artifact()).await.is_ok());
}

// ── failure policy ───────────────────────────────────────────────────

#[tokio::test]
async fn transport_failure_is_not_retried() {
    // Accept every connection and hang up without answering.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let connections = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&connections);
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(socket);
        }
    });

    let client = MetadataClient::new(ClientConfig::local_mock(port).unwrap()).unwrap();
    let started = Instant::now();
    let err = client.resolve(&artifact()).await.unwrap_err();

    assert!(matches!(err, ClientError::Http { .. }), "got: {err:?}");
    assert_eq!(connections.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn server_error_is_returned_after_one_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/narinfo/{ARTIFACT_HEX}")))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = test_client(&mock_server).resolve(&artifact()).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
}

// ── health ───────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check_reachable_service() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    assert!(client.health_check().await.is_healthy());
}

#[tokio::test]
async fn health_check_server_error_is_unavailable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server);
    assert!(!client.health_check().await.is_healthy());
}

#[tokio::test]
async fn health_check_unreachable_service() {
    let config = ClientConfig::new("http://127.0.0.1:1".parse().unwrap());
    let client = MetadataClient::new(config).unwrap();
    assert!(!client.health_check().await.is_healthy());
}
