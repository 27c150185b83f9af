//! File upload and visibility

use std::sync::{Arc, Mutex};

use rumpel_core::domain::{FileId, FileVisibility, PendingImage};
use rumpel_core::ports::{HatApiError, HatService, UploadProgress};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

fn image(size: usize) -> PendingImage {
    PendingImage::new("photo.jpg", "image/jpeg", vec![7u8; size])
}

async fn mount_register(server: &MockServer, renewed: Option<&str>) {
    let mut response = ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "fileId": "rumpelphoto-1.jpg",
        "name": "photo.jpg",
        "source": "rumpel",
        "contentUrl": format!("{}/bucket/rumpelphoto-1.jpg?signature=abc", server.uri()),
        "status": { "status": "New" }
    }));
    if let Some(token) = renewed {
        response = response.insert_header("x-auth-token", token);
    }

    Mock::given(method("POST"))
        .and(path("/api/v2/files/upload"))
        .and(body_partial_json(serde_json::json!({
            "name": "photo.jpg",
            "source": "rumpel",
            "tags": ["rumpel", "notes"]
        })))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_bucket(server: &MockServer, status: u16) {
    Mock::given(method("PUT"))
        .and(path("/bucket/rumpelphoto-1.jpg"))
        .and(header("x-amz-server-side-encryption", "AES256"))
        .and(header("content-type", "image/jpeg"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_runs_register_put_complete() {
    let (server, service) = common::setup_hat_mock().await;
    mount_register(&server, None).await;
    mount_bucket(&server, 200).await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/files/file/rumpelphoto-1.jpg/complete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let progress: UploadProgress = Box::new(move |sent, total| {
        recorder.lock().unwrap().push((sent, total));
    });

    let size = 150 * 1024;
    let result = service
        .upload_file(&common::token(), &image(size), Some(progress))
        .await
        .unwrap();

    assert_eq!(result.value.as_str(), "rumpelphoto-1.jpg");
    let seen = seen.lock().unwrap();
    assert!(seen.len() >= 2, "progress reported per chunk");
    assert_eq!(seen.last(), Some(&(size as u64, size as u64)));
    assert!(seen.windows(2).all(|pair| pair[0].0 < pair[1].0));
}

#[tokio::test]
async fn test_upload_uses_renewed_token_for_later_calls() {
    let (server, service) = common::setup_hat_mock().await;
    mount_register(&server, Some("renewed-token")).await;
    mount_bucket(&server, 200).await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/files/file/rumpelphoto-1.jpg/complete"))
        .and(header("authorization", common::bearer("renewed-token").as_str()))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let result = service
        .upload_file(&common::token(), &image(10), None)
        .await
        .unwrap();

    assert_eq!(result.renewed_token.unwrap().secret(), "renewed-token");
}

#[tokio::test]
async fn test_bucket_rejection_fails_upload() {
    let (server, service) = common::setup_hat_mock().await;
    mount_register(&server, None).await;
    mount_bucket(&server, 403).await;

    let err = service
        .upload_file(&common::token(), &image(10), None)
        .await
        .unwrap_err();

    assert!(matches!(err, HatApiError::Server { status: 403, .. }));
}

#[tokio::test]
async fn test_visibility_endpoints() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("PUT"))
        .and(path("/api/v2/files/allowAccessPublic/rumpelphoto-1.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v2/files/restrictAccessPublic/rumpelphoto-1.jpg"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let file = FileId::new("rumpelphoto-1.jpg").unwrap();
    service
        .set_file_visibility(&common::token(), &file, FileVisibility::Public)
        .await
        .unwrap();
    service
        .set_file_visibility(&common::token(), &file, FileVisibility::Private)
        .await
        .unwrap();
}
