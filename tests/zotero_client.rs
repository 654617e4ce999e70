//! Zotero web API client against a mock server.

use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zotwise::error::SourceError;
use zotwise::zotero::{LibraryType, SourceClient, ZoteroClient, ZoteroConfig};

fn client(server: &MockServer, library_type: LibraryType) -> ZoteroClient {
    let mut config = ZoteroConfig::new("zot-key", "123", library_type);
    config.base_url = server.uri();
    ZoteroClient::new(config).unwrap()
}

fn annotation(key: &str) -> serde_json::Value {
    json!({
        "key": key,
        "version": 10,
        "data": {
            "key": key,
            "version": 10,
            "itemType": "annotation",
            "annotationType": "highlight",
            "annotationText": "text",
            "parentItem": "ATTACH1",
            "dateModified": "2023-01-01T12:00:00Z",
            "tags": [],
            "relations": {}
        },
        "links": {"alternate": {"href": format!("https://www.zotero.org/users/123/items/{}", key)}}
    })
}

#[tokio::test]
async fn test_item_sends_api_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/123/items/DOC1"))
        .and(header("Zotero-API-Key", "zot-key"))
        .and(header("Zotero-API-Version", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key": "DOC1",
            "version": 5,
            "data": {"key": "DOC1", "itemType": "book", "title": "A Book"},
            "links": {"alternate": {"href": "https://www.zotero.org/users/123/items/DOC1"}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server, LibraryType::User).item("DOC1").await.unwrap();
    assert_eq!(record.key, "DOC1");
    assert_eq!(record.data.title.as_deref(), Some("A Book"));
}

#[tokio::test]
async fn test_item_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/groups/123/items/GONE"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&server)
        .await;

    let err = client(&server, LibraryType::Group).item("GONE").await.unwrap_err();
    assert!(matches!(err, SourceError::Status { status: 404, ref resource } if resource == "items/GONE"));
}

#[tokio::test]
async fn test_items_follows_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/123/items"))
        .and(query_param("itemType", "annotation"))
        .and(query_param("since", "7"))
        .and(query_param("start", "0"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Total-Results", "3")
                .set_body_json(json!([annotation("A1"), annotation("A2")])),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/123/items"))
        .and(query_param("start", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Total-Results", "3")
                .set_body_json(json!([annotation("A3")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let records = client(&server, LibraryType::User).items("annotation", 7).await.unwrap();
    let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["A1", "A2", "A3"]);
}

#[tokio::test]
async fn test_last_modified_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/123/items"))
        .and(query_param("format", "keys"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Last-Modified-Version", "4821")
                .set_body_string("ABC\n"),
        )
        .mount(&server)
        .await;

    let version = client(&server, LibraryType::User).last_modified_version().await.unwrap();
    assert_eq!(version, 4821);
}
