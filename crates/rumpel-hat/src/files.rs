//! File upload and visibility
//!
//! An upload takes three requests:
//! 1. `POST /api/v2/files/upload` registers the file and returns a
//!    pre-signed `contentUrl`
//! 2. the bytes are `PUT` to that URL with server-side encryption
//! 3. `PUT /api/v2/files/file/{fileId}/complete` marks the file done
//!
//! Visibility is switched afterwards with `allowAccessPublic` or
//! `restrictAccessPublic`.

use futures_util::stream::{self, StreamExt};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use rumpel_core::domain::{AccessToken, FileId, FileVisibility, PendingImage};
use rumpel_core::ports::{Renewable, UploadProgress};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{HatClient, TokenCursor};
use crate::HatError;

/// Source recorded on every uploaded file
const FILE_SOURCE: &str = "rumpel";

/// Body chunk size for the content upload; progress is reported per chunk
const CHUNK_SIZE: usize = 64 * 1024;

/// Header required by the storage bucket
const ENCRYPTION_HEADER: &str = "x-amz-server-side-encryption";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    name: &'a str,
    source: &'static str,
    tags: &'a [String],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    file_id: String,
    content_url: Option<String>,
}

// ============================================================================
// Calls
// ============================================================================

/// Uploads an image and returns its file id
///
/// # Arguments
/// * `tags` - Tags recorded on the file
/// * `progress` - Optional callback `(bytes_sent, total_bytes)` called per chunk
pub async fn upload(
    client: &HatClient,
    token: &AccessToken,
    image: &PendingImage,
    tags: &[String],
    progress: Option<UploadProgress>,
) -> Result<Renewable<FileId>, HatError> {
    if image.is_empty() {
        return Err(HatError::BadRequest("image has no content".into()));
    }
    let mut cursor = TokenCursor::new(token);

    // Step 1: Register the file
    let request = client
        .request(Method::POST, "/api/v2/files/upload", cursor.token())
        .json(&UploadRequest {
            name: &image.name,
            source: FILE_SOURCE,
            tags,
        });
    let (registered, renewed): (UploadResponse, _) = client.execute(request).await?.json().await?;
    cursor.observe(renewed);

    let file_id = FileId::new(registered.file_id)
        .map_err(|e| HatError::InvalidResponse(e.to_string()))?;
    let content_url = registered
        .content_url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| HatError::InvalidResponse(format!("no contentUrl for file {file_id}")))?;
    debug!(file = %file_id, size = image.len(), "Registered upload");

    // Step 2: Send the bytes to the storage bucket
    let total = image.len() as u64;
    let request = client
        .external(Method::PUT, &content_url)
        .header(ENCRYPTION_HEADER, "AES256")
        .header(CONTENT_TYPE, image.content_type.as_str())
        .header(CONTENT_LENGTH, total)
        .body(progress_body(image.bytes.clone(), progress));
    client.execute(request).await?;
    debug!(file = %file_id, "Uploaded file content");

    // Step 3: Mark the upload complete
    let path = format!("/api/v2/files/file/{}/complete", file_id);
    let reply = client
        .execute(client.request(Method::PUT, &path, cursor.token()))
        .await?;
    cursor.observe(reply.renewed_token);

    info!(file = %file_id, bytes = total, "Upload complete");
    Ok(cursor.finish(file_id))
}

/// Makes an uploaded file public or private
pub async fn set_visibility(
    client: &HatClient,
    token: &AccessToken,
    file_id: &FileId,
    visibility: FileVisibility,
) -> Result<Renewable<()>, HatError> {
    let path = visibility_path(file_id, visibility);
    let reply = client
        .execute(client.request(Method::PUT, &path, token))
        .await?;
    debug!(file = %file_id, %visibility, "Updated file visibility");
    Ok(reply.into_renewable(()))
}

fn visibility_path(file_id: &FileId, visibility: FileVisibility) -> String {
    match visibility {
        FileVisibility::Public => format!("/api/v2/files/allowAccessPublic/{}", file_id),
        FileVisibility::Private => format!("/api/v2/files/restrictAccessPublic/{}", file_id),
    }
}

/// Streams `bytes` in chunks, reporting each chunk as it is handed to the connection
fn progress_body(bytes: Vec<u8>, progress: Option<UploadProgress>) -> Body {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;

    let body = stream::iter(chunks).map(move |chunk| {
        sent += chunk.len() as u64;
        if let Some(ref callback) = progress {
            callback(sent, total);
        }
        Ok::<_, std::io::Error>(chunk)
    });
    Body::wrap_stream(body)
}
