//! Note records under `/api/v2/data/rumpel/notablesv1`

use rumpel_core::domain::{NoteId, NoteKind, Note, ShareDestination};
use rumpel_core::ports::{HatApiError, HatService};
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn record(id: &str, message: &str, updated: &str, shared: bool, shared_on: &str) -> serde_json::Value {
    serde_json::json!({
        "endpoint": "rumpel/notablesv1",
        "recordId": id,
        "data": {
            "notablesv1": {
                "message": message,
                "kind": "note",
                "created_time": "2017-06-01T10:00:00.000Z",
                "updated_time": updated,
                "shared": shared,
                "shared_on": shared_on,
                "authorv1": { "phata": "alice.hubofallthings.net" }
            }
        }
    })
}

#[tokio::test]
async fn test_fetch_notes_most_recent_first() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/data/rumpel/notablesv1"))
        .and(query_param("orderBy", "updated_time"))
        .and(query_param("ordering", "descending"))
        .and(query_param("take", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            record("older", "first", "2017-06-01T10:00:00.000Z", true, "facebook,"),
            record("newer", "second", "2017-06-02T10:00:00.000Z", false, "twitter,"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let result = service.fetch_notes(&common::token()).await.unwrap();
    let notes = result.value;

    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].id().unwrap().as_str(), "newer");
    assert!(notes[0].shared_on().is_empty());
    assert_eq!(notes[1].message(), "first");
    assert!(notes[1].shared_on().contains(ShareDestination::Facebook));
}

#[tokio::test]
async fn test_fetch_notes_with_expired_token() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/data/rumpel/notablesv1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = service.fetch_notes(&common::token()).await.unwrap_err();
    assert_eq!(err, HatApiError::TokenExpired);
}

#[tokio::test]
async fn test_post_note_sends_wrapped_record() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("POST"))
        .and(path("/api/v2/data/rumpel/notablesv1"))
        .and(header("authorization", common::bearer(common::TOKEN).as_str()))
        .and(body_partial_json(serde_json::json!({
            "notablesv1": {
                "message": "hello world",
                "kind": "note",
                "shared": true,
                "shared_on": "facebook,",
                "authorv1": { "phata": "alice.hubofallthings.net" }
            }
        })))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("x-auth-token", "renewed-token")
                .set_body_json(record("rec-9", "hello world", "2017-06-02T10:00:00.000Z", true, "facebook,")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut note = Note::new(NoteKind::Note).with_message("hello world");
    note.set_shared(true);
    note.add_destination(ShareDestination::Facebook);

    let result = service.post_note(&common::token(), &note).await.unwrap();

    assert_eq!(result.value.as_str(), "rec-9");
    assert_eq!(result.renewed_token.unwrap().secret(), "renewed-token");
}

#[tokio::test]
async fn test_delete_note_by_record_id() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v2/data"))
        .and(query_param("records", "rec-9"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let id = NoteId::new("rec-9").unwrap();
    let result = service.delete_note(&common::token(), &id).await.unwrap();
    assert!(result.renewed_token.is_none());
}

#[tokio::test]
async fn test_delete_missing_note_is_not_found() {
    let (server, service) = common::setup_hat_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/api/v2/data"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such record"))
        .mount(&server)
        .await;

    let id = NoteId::new("gone").unwrap();
    let err = service.delete_note(&common::token(), &id).await.unwrap_err();
    assert_eq!(err, HatApiError::NotFound("no such record".into()));
}
