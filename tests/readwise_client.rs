//! Readwise batch upload against a mock server.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zotwise::error::UploadError;
use zotwise::readwise::{Category, Highlight, ReadwiseClient, ReadwiseConfig};

fn client(server: &MockServer, log_dir: &std::path::Path) -> ReadwiseClient {
    let mut config = ReadwiseConfig::new("rw-token");
    config.base_url = server.uri();
    config.error_log_dir = log_dir.to_path_buf();
    ReadwiseClient::new(config).unwrap()
}

fn highlight() -> Highlight {
    let mut highlight = Highlight::new("Sample highlight", Category::Books);
    highlight.title = Some("Sample Book".into());
    highlight.location = Some(12);
    highlight
}

#[tokio::test]
async fn test_create_highlights_posts_sparse_batch() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/highlights/"))
        .and(header("Authorization", "Token rw-token"))
        .and(body_partial_json(json!({
            "highlights": [{
                "text": "Sample highlight",
                "title": "Sample Book",
                "category": "books",
                "location": 12,
                "location_type": "page"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client(&server, dir.path())
        .create_highlights(&[highlight()])
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let sent = body["highlights"][0].as_object().unwrap();
    assert!(!sent.contains_key("note"));
    assert!(!sent.contains_key("author"));
}

#[tokio::test]
async fn test_empty_batch_is_not_sent() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    client(&server, dir.path()).create_highlights(&[]).await.unwrap();
}

#[tokio::test]
async fn test_rejected_upload_writes_error_log() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .and(path("/highlights/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"highlights": [{"text": ["too long"]}]})))
        .mount(&server)
        .await;

    let err = client(&server, dir.path())
        .create_highlights(&[highlight()])
        .await
        .unwrap_err();

    match err {
        UploadError::Rejected {
            status,
            reason,
            error_log,
        } => {
            assert_eq!(status, 400);
            assert_eq!(reason, "Bad Request");
            let error_log = error_log.unwrap();
            assert_eq!(
                error_log,
                dir.path().join("error_log_400_failed_post_request_to_readwise.json")
            );
            let logged: serde_json::Value =
                serde_json::from_str(&std::fs::read_to_string(&error_log).unwrap()).unwrap();
            assert_eq!(logged["highlights"][0]["text"][0], "too long");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_rejected_upload_with_empty_body() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client(&server, dir.path())
        .create_highlights(&[highlight()])
        .await
        .unwrap_err();
    let UploadError::Rejected { status, error_log, .. } = err else {
        panic!("expected a rejected upload");
    };
    assert_eq!(status, 500);
    let logged: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(error_log.unwrap()).unwrap()).unwrap();
    assert_eq!(logged, json!({"error": "Empty response body"}));
}

#[tokio::test]
async fn test_rejection_survives_unwritable_error_log() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "").unwrap();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})))
        .mount(&server)
        .await;

    let err = client(&server, &blocker)
        .create_highlights(&[highlight()])
        .await
        .unwrap_err();
    match err {
        UploadError::Rejected {
            status,
            reason,
            error_log,
        } => {
            assert_eq!(status, 401);
            assert_eq!(reason, "Unauthorized");
            assert_eq!(error_log, None);
        }
        other => panic!("unexpected error: {other}"),
    }
}
