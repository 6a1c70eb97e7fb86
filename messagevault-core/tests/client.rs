use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use messagevault_core::{DriveClient, DriveError, FOLDER_MIME_TYPE};

fn client_for(server: &MockServer) -> DriveClient {
    DriveClient::with_base_urls(
        &format!("{}/drive/v3", server.uri()),
        &format!("{}/upload/drive/v3", server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn list_files_sends_bearer_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("q", "trashed=false and name='a.txt' and 'p' in parents"))
        .and(query_param("fields", "files(id,name)"))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{ "id": "file-1", "name": "a.txt" }]
        })))
        .mount(&server)
        .await;

    let files = client_for(&server)
        .list_files(
            "test-token",
            "trashed=false and name='a.txt' and 'p' in parents",
            1,
            None,
        )
        .await
        .unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].id, "file-1");
}

#[tokio::test]
async fn list_files_treats_missing_files_as_empty() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let files = client_for(&server)
        .list_files("test-token", "trashed=false", 1, None)
        .await
        .unwrap();

    assert!(files.is_empty());
}

#[tokio::test]
async fn create_folder_posts_folder_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(query_param("fields", "id,name"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "name": "Jane Doe",
            "mimeType": FOLDER_MIME_TYPE,
            "parents": ["root-1"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "folder-1",
            "name": "Jane Doe"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = client_for(&server)
        .create_folder("test-token", "Jane Doe", "root-1")
        .await
        .unwrap();

    assert_eq!(folder.id, "folder-1");
    assert_eq!(folder.name, "Jane Doe");
}

#[tokio::test]
async fn upload_text_sends_multipart_related_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(query_param("fields", "id,name"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_string_contains(
            "Content-Type: application/json; charset=UTF-8\r\n\r\n{\"name\":\"2024-03-05T14-22.txt\",\"parents\":[\"leaf\"]}",
        ))
        .and(body_string_contains(
            "Content-Type: text/plain; charset=UTF-8\r\n\r\nDear Jane,\nhello",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-9",
            "name": "2024-03-05T14-22.txt"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let file = client_for(&server)
        .upload_text("test-token", "2024-03-05T14-22.txt", "leaf", "Dear Jane,\nhello")
        .await
        .unwrap();

    assert_eq!(file.id, "file-9");
}

#[tokio::test]
async fn api_errors_carry_status_and_drive_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 403, "message": "Insufficient Permission" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_folder("test-token", "Jane Doe", "root-1")
        .await
        .unwrap_err();

    assert!(matches!(err, DriveError::Api { .. }));
    assert_eq!(err.to_string(), "Insufficient Permission");
    assert!(!err.is_unauthorized());
}

#[tokio::test]
async fn unauthorized_is_detected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .list_files("stale", "trashed=false", 1, None)
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Google Drive request failed.");
}

#[tokio::test]
async fn upload_error_without_drive_message_uses_generic_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "x" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .upload_text("test-token", "a.txt", "leaf-1", "hello")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Google Drive upload failed.");
}
