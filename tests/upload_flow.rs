use std::time::{Duration, Instant};

use bytes::Bytes;
use damup::{
    ChunkFailurePolicy, ChunkSize, FsMediaLibrary, MediaItem, MediaKind, Timing, UploadError,
    UploadEvent, UploadPhase, Uploader, UploaderConfig,
};
use futures::StreamExt;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

const MB: usize = 1024 * 1024;

fn fast_timing() -> Timing {
    Timing {
        settle_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
        ready_timeout_per_chunk: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
    }
}

fn uploader(server: &MockServer) -> Uploader {
    uploader_with_timing(server, fast_timing())
}

fn uploader_with_timing(server: &MockServer, timing: Timing) -> Uploader {
    let url = Url::parse(&format!("{}/graphql", server.uri())).unwrap();
    let config = UploaderConfig::new("test-token", "project-1")
        .with_frontify_url(url)
        .with_folders_path(vec!["Migrated".to_string()])
        .with_chunk_size(ChunkSize::new(5 * MB as u64).unwrap())
        .with_timing(timing);
    Uploader::new(config)
}

fn media_item(file_path: &str, kind: MediaKind) -> MediaItem {
    MediaItem {
        file_path: file_path.to_string(),
        title: "Banner".to_string(),
        description: "Spring campaign".to_string(),
        author: "Marketing".to_string(),
        total_size: 0,
        kind,
    }
}

fn graphql(operation: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({ "operationName": operation })))
}

fn data(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "data": value }))
}

fn errors(messages: &[&str]) -> ResponseTemplate {
    let errors: Vec<Value> = messages
        .iter()
        .map(|message| json!({ "message": message }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "data": null, "errors": errors }))
}

async fn mount_upload_session(server: &MockServer, chunks: usize) {
    let urls: Vec<String> = (0..chunks)
        .map(|i| format!("{}/chunks/{}", server.uri(), i))
        .collect();
    graphql("UploadFile")
        .respond_with(data(json!({ "uploadFile": { "id": "file-1", "urls": urls } })))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_chunk(server: &MockServer, index: usize, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/chunks/{}", index)))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_create_asset(server: &MockServer) {
    graphql("CreateAsset")
        .respond_with(data(json!({ "createAsset": { "job": { "assetId": "asset-1" } } })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_image_upload_runs_all_phases() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    Mock::given(method("PUT"))
        .and(path("/chunks/0"))
        .and(header("content-type", "image/png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .and(header("authorization", "Bearer test-token"))
        .and(header("x-frontify-beta", "enabled"))
        .respond_with(data(json!({
            "asset": {
                "type": "Image",
                "id": "asset-1",
                "previewUrl": "https://cdn.example/img?already=1",
                "downloadUrl": "https://cdn.example/img/download"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = media_item("/images/campaigns/2024/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"\x89PNG"))
        .await;

    assert_eq!(outcome.error_message, None);
    assert_eq!(outcome.asset_id.as_deref(), Some("asset-1"));
    assert_eq!(outcome.url.as_deref(), Some("https://cdn.example/img?already=1"));
    assert_eq!(outcome.extension, None);

    let requests = server.received_requests().await.unwrap();
    let bodies: Vec<Value> = requests
        .iter()
        .filter(|request| request.url.path() == "/graphql")
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect();

    assert_eq!(
        bodies[0]["variables"],
        json!({ "file": { "filename": "banner.png", "size": 4, "chunkSize": 5 * MB } })
    );
    assert_eq!(
        bodies[1]["variables"]["asset"],
        json!({
            "projectId": "project-1",
            "fileId": "file-1",
            "title": "Banner",
            "description": "Spring campaign",
            "directory": ["Migrated", "campaigns", "2024"],
            "author": "Marketing"
        })
    );
    assert_eq!(bodies[2]["variables"], json!({ "id": "asset-1" }));
    assert!(bodies[2]["query"].as_str().unwrap().contains("... on Image"));
}

#[tokio::test]
async fn test_chunks_are_sent_in_order() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 3).await;
    for index in 0..3 {
        mount_chunk(&server, index, 200).await;
    }
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(data(json!({
            "asset": {
                "type": "Video",
                "previewUrl": "https://cdn.example/video/a",
                "downloadUrl": "https://cdn.example/video/a/download"
            }
        })))
        .mount(&server)
        .await;

    let payload: Vec<u8> = (0..(10 * MB + 3)).map(|i| (i / (5 * MB)) as u8).collect();
    let item = media_item("/videos/clip.mp4", MediaKind::Video);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from(payload))
        .await;

    assert_eq!(outcome.url.as_deref(), Some("https://cdn.example/video/a?format=.mp4"));
    assert_eq!(outcome.extension.as_deref(), Some(".mp4"));

    let requests = server.received_requests().await.unwrap();
    let puts: Vec<_> = requests
        .iter()
        .filter(|request| request.method.as_str() == "PUT")
        .collect();
    assert_eq!(puts.len(), 3);
    for (index, request) in puts.iter().enumerate() {
        assert_eq!(request.url.path(), format!("/chunks/{}", index));
        assert!(request.body.iter().all(|b| *b as usize == index));
    }
    assert_eq!(puts[0].body.len(), 5 * MB);
    assert_eq!(puts[2].body.len(), 3);
}

#[tokio::test]
async fn test_upload_file_error_stops_before_asset_creation() {
    let server = MockServer::start().await;
    graphql("UploadFile")
        .respond_with(errors(&["Invalid chunk size"]))
        .expect(1)
        .mount(&server)
        .await;
    graphql("CreateAsset")
        .respond_with(data(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert_eq!(
        outcome.error_message.as_deref(),
        Some("UploadFile failed: Invalid chunk size")
    );
    assert_eq!(outcome.asset_id, None);
}

#[tokio::test]
async fn test_missing_upload_session_fields() {
    let server = MockServer::start().await;
    graphql("UploadFile")
        .respond_with(data(json!({ "uploadFile": { "id": "file-1", "urls": [] } })))
        .mount(&server)
        .await;
    graphql("CreateAsset")
        .respond_with(data(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert_eq!(
        outcome.error_message.as_deref(),
        Some("UploadFile failed: Missing property values after UploadFile mutation")
    );
}

#[tokio::test]
async fn test_unparseable_response_fails_upload() {
    let server = MockServer::start().await;
    graphql("UploadFile")
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    let message = outcome.error_message.unwrap();
    assert!(message.starts_with("UploadFile failed: Frontify responded with 502"));
    assert!(message.contains("Bad gateway"));
}

#[tokio::test]
async fn test_unparseable_success_response_fails_upload() {
    let server = MockServer::start().await;
    graphql("UploadFile")
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert!(
        outcome
            .error_message
            .unwrap()
            .starts_with("UploadFile failed: Unable to parse GraphQL response")
    );
}

#[tokio::test]
async fn test_slow_upload_file_request_times_out() {
    let server = MockServer::start().await;
    graphql("UploadFile")
        .respond_with(
            data(json!({ "uploadFile": { "id": "file-1", "urls": ["unused"] } }))
                .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let uploader = uploader_with_timing(
        &server,
        Timing {
            request_timeout: Duration::from_millis(200),
            ..fast_timing()
        },
    );
    let item = media_item("/images/banner.png", MediaKind::Image);
    let started = Instant::now();
    let outcome = uploader
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.asset_id, None);
    assert!(
        outcome
            .error_message
            .unwrap()
            .starts_with("UploadFile failed: GraphQL request failed")
    );
}

#[tokio::test]
async fn test_url_count_mismatch_fails_before_any_put() {
    let server = MockServer::start().await;
    graphql("UploadFile")
        .respond_with(data(json!({
            "uploadFile": {
                "id": "file-1",
                "urls": [
                    format!("{}/chunks/0", server.uri()),
                    format!("{}/chunks/1", server.uri())
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    graphql("CreateAsset")
        .respond_with(data(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let events: Vec<UploadEvent> = uploader(&server)
        .upload_stream(&item, Bytes::from_static(b"data"))
        .collect()
        .await;

    assert!(
        !events
            .iter()
            .any(|event| matches!(event, UploadEvent::ChunkUploaded { .. }))
    );
    match events.last() {
        Some(UploadEvent::Finished(outcome)) => {
            assert_eq!(outcome.asset_id, None);
            assert_eq!(
                outcome.error_message.as_deref(),
                Some("UploadFile failed: Upload session returned 2 chunk URLs for 1 chunks")
            );
        }
        other => panic!("unexpected last event: {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_failed_chunk_is_ignored_by_default() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 500).await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(data(json!({
            "asset": {
                "type": "Document",
                "previewUrl": "https://cdn.example/doc/preview",
                "downloadUrl": "https://cdn.example/doc.pdf"
            }
        })))
        .mount(&server)
        .await;

    let item = media_item("/documents/report.pdf", MediaKind::Other);
    let uploader = uploader(&server);
    let events: Vec<UploadEvent> = uploader
        .upload_stream(&item, Bytes::from_static(b"%PDF"))
        .collect()
        .await;

    assert!(events.iter().any(|event| matches!(
        event,
        UploadEvent::ChunkUploaded { index: 0, total: 1, success: false }
    )));
    match events.last() {
        Some(UploadEvent::Finished(outcome)) => {
            assert_eq!(outcome.error_message, None);
            assert_eq!(outcome.url.as_deref(), Some("https://cdn.example/doc.pdf"));
        }
        other => panic!("unexpected last event: {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_chunk_fails_upload_when_strict() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 403).await;
    graphql("CreateAsset")
        .respond_with(data(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/graphql", server.uri())).unwrap();
    let uploader = Uploader::new(
        UploaderConfig::new("test-token", "project-1")
            .with_frontify_url(url)
            .with_chunk_failures(ChunkFailurePolicy::Fail)
            .with_timing(fast_timing()),
    );
    let item = media_item("/documents/report.pdf", MediaKind::Other);
    let outcome = uploader
        .upload_item(&item, Bytes::from_static(b"%PDF"))
        .await;

    assert_eq!(outcome.error_message.as_deref(), Some("Upload of chunk(s) [0] failed"));
}

#[tokio::test]
async fn test_missing_asset_id() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 200).await;
    graphql("CreateAsset")
        .respond_with(data(json!({ "createAsset": { "job": { "assetId": null } } })))
        .mount(&server)
        .await;
    graphql("AssetById")
        .respond_with(data(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert_eq!(
        outcome.error_message.as_deref(),
        Some("CreateAsset failed: Asset Id cannot be obtained from CreateAsset mutation result")
    );
}

#[tokio::test]
async fn test_polls_until_download_url_is_issued() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 200).await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(data(json!({
            "asset": { "type": "Document", "previewUrl": null, "downloadUrl": null }
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    graphql("AssetById")
        .respond_with(data(json!({
            "asset": {
                "type": "Document",
                "previewUrl": "https://cdn.example/doc/preview",
                "downloadUrl": "https://cdn.example/doc.pdf"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = media_item("/documents/report.pdf", MediaKind::Other);
    let uploader = uploader(&server);
    let events: Vec<UploadEvent> = uploader
        .upload_stream(&item, Bytes::from_static(b"%PDF"))
        .collect()
        .await;

    let attempts = events
        .iter()
        .filter(|event| matches!(event, UploadEvent::Polled { .. }))
        .count();
    assert_eq!(attempts, 3);
    assert!(matches!(events[events.len() - 2], UploadEvent::Phase(UploadPhase::Done)));
    match events.last() {
        Some(UploadEvent::Finished(outcome)) => {
            assert_eq!(outcome.url.as_deref(), Some("https://cdn.example/doc.pdf"));
        }
        other => panic!("unexpected last event: {:?}", other),
    }

    let requests = server.received_requests().await.unwrap();
    let poll: Value = serde_json::from_slice(&requests.last().unwrap().body).unwrap();
    assert!(
        poll["query"]
            .as_str()
            .unwrap()
            .contains("downloadUrl(permanent: true)")
    );
}

#[tokio::test]
async fn test_polling_gives_up_at_deadline() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 200).await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(data(json!({
            "asset": { "type": "Document", "previewUrl": null, "downloadUrl": null }
        })))
        .mount(&server)
        .await;

    let url = Url::parse(&format!("{}/graphql", server.uri())).unwrap();
    let uploader = Uploader::new(
        UploaderConfig::new("test-token", "project-1")
            .with_frontify_url(url)
            .with_timing(Timing {
                settle_delay: Duration::ZERO,
                poll_interval: Duration::from_millis(20),
                ready_timeout_per_chunk: Duration::from_millis(150),
                request_timeout: Duration::from_secs(5),
            }),
    );
    let item = media_item("/documents/report.pdf", MediaKind::Other);
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        uploader.upload_item(&item, Bytes::from_static(b"%PDF")),
    )
    .await
    .expect("polling must stop at its deadline");

    assert_eq!(outcome.asset_id.as_deref(), Some("asset-1"));
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("AssetById failed: Missing property values after query by asset id asset-1")
    );
    assert_eq!(outcome.url, None);
}

#[tokio::test]
async fn test_slow_poll_is_cut_at_deadline() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 200).await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(
            data(json!({
                "asset": {
                    "type": "Image",
                    "previewUrl": "https://cdn.example/img",
                    "downloadUrl": "https://cdn.example/img/download"
                }
            }))
            .set_delay(Duration::from_secs(4)),
        )
        .mount(&server)
        .await;

    let uploader = uploader_with_timing(
        &server,
        Timing {
            ready_timeout_per_chunk: Duration::from_millis(200),
            ..fast_timing()
        },
    );
    let item = media_item("/images/banner.png", MediaKind::Image);
    let started = Instant::now();
    let outcome = uploader
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(outcome.asset_id.as_deref(), Some("asset-1"));
    assert_eq!(outcome.url, None);
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("AssetById failed: Missing property values after query by asset id asset-1")
    );
}

#[tokio::test]
async fn test_poll_error_keeps_asset_id() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    mount_chunk(&server, 0, 200).await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(errors(&["Asset not found"]))
        .expect(1)
        .mount(&server)
        .await;

    let item = media_item("/images/banner.png", MediaKind::Image);
    let outcome = uploader(&server)
        .upload_item(&item, Bytes::from_static(b"data"))
        .await;

    assert_eq!(outcome.asset_id.as_deref(), Some("asset-1"));
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("AssetById failed: Asset not found")
    );
}

#[tokio::test]
async fn test_upload_from_media_library() {
    let server = MockServer::start().await;
    mount_upload_session(&server, 1).await;
    Mock::given(method("PUT"))
        .and(path("/chunks/0"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    mount_create_asset(&server).await;
    graphql("AssetById")
        .respond_with(data(json!({
            "asset": {
                "type": "Image",
                "previewUrl": "https://cdn.example/photo",
                "downloadUrl": "https://cdn.example/photo/download"
            }
        })))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("images/team")).unwrap();
    std::fs::write(root.path().join("images/team/photo.jpg"), b"\xff\xd8\xff").unwrap();

    let library = FsMediaLibrary::new(root.path());
    let outcome = uploader(&server)
        .upload(&library, "team/photo.jpg", "images")
        .await;

    assert_eq!(outcome.url.as_deref(), Some("https://cdn.example/photo"));

    let requests = server.received_requests().await.unwrap();
    let create: Value = serde_json::from_slice(&requests[2].body).unwrap();
    assert_eq!(create["variables"]["asset"]["title"], "photo");
    assert_eq!(
        create["variables"]["asset"]["directory"],
        json!(["Migrated", "team"])
    );
}

#[tokio::test]
async fn test_upload_of_missing_media_fails_without_requests() {
    let server = MockServer::start().await;
    let root = tempfile::tempdir().unwrap();

    let outcome = uploader(&server)
        .upload(&FsMediaLibrary::new(root.path()), "missing.png", "images")
        .await;

    assert!(outcome.error_message.is_some());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_asset() {
    let server = MockServer::start().await;
    graphql("DeleteAsset")
        .and(body_partial_json(json!({ "variables": { "asset": { "id": "asset-1" } } })))
        .respond_with(data(json!({ "deleteAsset": { "asset": { "id": "asset-1" } } })))
        .expect(1)
        .mount(&server)
        .await;

    uploader(&server).delete_asset("asset-1").await.unwrap();
}

#[tokio::test]
async fn test_delete_reports_remote_errors() {
    let server = MockServer::start().await;
    graphql("DeleteAsset")
        .respond_with(errors(&["Asset not found", "Permission denied"]))
        .expect(1)
        .mount(&server)
        .await;

    let err = uploader(&server)
        .delete_asset("asset-404")
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Asset not found; Permission denied");
}

#[tokio::test]
async fn test_delete_rejected_with_http_status() {
    let server = MockServer::start().await;
    graphql("DeleteAsset")
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Unauthorized" })))
        .expect(1)
        .mount(&server)
        .await;

    let err = uploader(&server)
        .delete_asset("asset-1")
        .await
        .unwrap_err();

    match err {
        UploadError::Status { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("Unauthorized"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_without_confirmation_fails() {
    let server = MockServer::start().await;
    graphql("DeleteAsset")
        .respond_with(data(Value::Null))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    graphql("DeleteAsset")
        .respond_with(data(json!({ "deleteAsset": { "asset": null } })))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = uploader(&server);
    for _ in 0..2 {
        let err = uploader.delete_asset("asset-1").await.unwrap_err();
        assert!(matches!(err, UploadError::AssetNotDeleted { ref asset_id } if asset_id == "asset-1"));
        assert_eq!(
            err.to_string(),
            "DeleteAsset did not confirm deletion of asset asset-1"
        );
    }
}
