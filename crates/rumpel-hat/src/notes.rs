//! Note records
//!
//! Notes live in the `rumpel/notablesv1` data endpoint. Each record wraps
//! the note in a `notablesv1` object. Records written by older clients are
//! loosely typed (booleans and numbers sometimes arrive as strings), so
//! reading goes through [`serde_json::Value`] and never fails on a single
//! malformed field.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use reqwest::Method;
use rumpel_core::domain::{
    AccessToken, Author, LocationData, Note, NoteId, NoteKind, SharedOn,
};
use rumpel_core::ports::Renewable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::HatClient;
use crate::HatError;

/// Data endpoint holding note records
pub const NOTES_PATH: &str = "/api/v2/data/rumpel/notablesv1";

/// Source tag written on attached photos
const PHOTO_SOURCE: &str = "rumpel";

// ============================================================================
// Wire types
// ============================================================================

/// A record as returned by the data API
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataRecord {
    record_id: String,
    #[serde(default)]
    data: Value,
}

/// Request body for creating a note
#[derive(Debug, Serialize)]
struct NotablesEnvelope {
    notablesv1: NotableRecord,
}

#[derive(Debug, Serialize)]
struct NotableRecord {
    message: String,
    kind: &'static str,
    created_time: String,
    updated_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    public_until: Option<String>,
    shared: bool,
    currently_shared: bool,
    shared_on: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    photov1: Option<PhotoRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    locationv1: Option<LocationRecord>,
    authorv1: AuthorRecord,
}

#[derive(Debug, Serialize)]
struct PhotoRecord {
    link: String,
    source: &'static str,
    caption: String,
    shared: bool,
}

#[derive(Debug, Serialize)]
struct LocationRecord {
    latitude: f64,
    longitude: f64,
    accuracy: f64,
    shared: bool,
}

#[derive(Debug, Serialize)]
struct AuthorRecord {
    nick: String,
    name: String,
    photo_url: String,
    phata: String,
    id: i64,
}

impl NotableRecord {
    /// Builds the stored form of `note`
    ///
    /// A note without an author is attributed to `phata`.
    fn from_note(note: &Note, phata: &str) -> Self {
        let shared = note.is_shared();
        let author = note.author().cloned().unwrap_or_else(|| Author {
            phata: phata.to_string(),
            ..Author::default()
        });

        Self {
            message: note.message().to_string(),
            kind: note.kind().as_str(),
            created_time: format_time(note.created_time()),
            updated_time: format_time(note.updated_time()),
            public_until: note.public_until().map(format_time),
            shared,
            currently_shared: shared,
            shared_on: note.shared_on().to_wire(),
            photov1: note.photo().map(|photo| PhotoRecord {
                link: photo.link.clone(),
                source: PHOTO_SOURCE,
                caption: String::new(),
                shared,
            }),
            locationv1: note.location().map(|location| LocationRecord {
                latitude: location.latitude,
                longitude: location.longitude,
                accuracy: location.accuracy,
                shared,
            }),
            authorv1: AuthorRecord {
                nick: author.nick,
                name: author.name,
                photo_url: author.photo_url,
                phata: author.phata,
                id: author.id,
            },
        }
    }
}

fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ============================================================================
// Lenient reading
// ============================================================================

fn text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn flag(value: &Value, key: &str) -> bool {
    match value.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn number(value: &Value, key: &str) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Accepts RFC 3339 strings and epoch milliseconds
fn time(value: &Value, key: &str) -> Option<DateTime<Utc>> {
    match value.get(key)? {
        Value::String(s) if !s.is_empty() => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                s.parse::<i64>()
                    .ok()
                    .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

/// Reads a note out of a data record; `None` when the record is unusable
fn note_from_record(record: DataRecord) -> Option<Note> {
    let id = match NoteId::new(record.record_id) {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Skipping note record with invalid id");
            return None;
        }
    };
    let Some(body) = record.data.get("notablesv1") else {
        warn!(record = %id, "Skipping record without a notablesv1 body");
        return None;
    };

    let kind_raw = text(body, "kind");
    let kind = kind_raw.parse::<NoteKind>().unwrap_or_else(|_| {
        debug!(record = %id, kind = %kind_raw, "Unknown note kind, reading as note");
        NoteKind::Note
    });

    let now = Utc::now();
    let created = time(body, "created_time").unwrap_or(now);
    let updated = time(body, "updated_time").unwrap_or(created);

    let mut note = Note::new(kind)
        .with_id(id)
        .with_message(text(body, "message"))
        .with_sharing(
            flag(body, "shared"),
            SharedOn::parse(&text(body, "shared_on")),
            time(body, "public_until"),
        )
        .with_times(created, updated);

    if let Some(photo) = body.get("photov1") {
        note = note.with_photo_link(text(photo, "link"));
    }
    if let Some(location) = body.get("locationv1") {
        note = note.with_location(LocationData::from_stored(
            number(location, "latitude"),
            number(location, "longitude"),
            number(location, "accuracy"),
        ));
    }
    if let Some(author) = body.get("authorv1") {
        note = note.with_author(Author {
            nick: text(author, "nick"),
            name: text(author, "name"),
            photo_url: text(author, "photo_url"),
            phata: text(author, "phata"),
            id: text(author, "id").parse().unwrap_or(0),
        });
    }

    Some(note)
}

/// Reads the record id of a created record; the API answers with the
/// record itself or a one-element array
fn created_record_id(value: Value) -> Result<NoteId, HatError> {
    let record = match value {
        Value::Array(mut records) if !records.is_empty() => records.swap_remove(0),
        other => other,
    };
    let id = record
        .get("recordId")
        .and_then(Value::as_str)
        .ok_or_else(|| HatError::InvalidResponse("created record has no recordId".into()))?;
    NoteId::new(id).map_err(|e| HatError::InvalidResponse(e.to_string()))
}

// ============================================================================
// Calls
// ============================================================================

/// Fetches up to `take` notes, most recently updated first
pub async fn fetch(
    client: &HatClient,
    token: &AccessToken,
    take: u32,
) -> Result<Renewable<Vec<Note>>, HatError> {
    let request = client.request(Method::GET, NOTES_PATH, token).query(&[
        ("orderBy", "updated_time".to_string()),
        ("ordering", "descending".to_string()),
        ("take", take.to_string()),
    ]);

    let (records, renewed): (Vec<DataRecord>, _) = client.execute(request).await?.json().await?;
    let total = records.len();

    let mut notes: Vec<Note> = records.into_iter().filter_map(note_from_record).collect();
    notes.sort_by(|a, b| b.updated_time().cmp(&a.updated_time()));

    debug!(total, usable = notes.len(), "Fetched note records");
    Ok(wrap(notes, renewed))
}

/// Creates a note record and returns its id
///
/// The note's own id is never sent; the HAT assigns a new one.
pub async fn post(
    client: &HatClient,
    token: &AccessToken,
    note: &Note,
    phata: &str,
) -> Result<Renewable<NoteId>, HatError> {
    let body = NotablesEnvelope {
        notablesv1: NotableRecord::from_note(note, phata),
    };
    let request = client.request(Method::POST, NOTES_PATH, token).json(&body);

    let (created, renewed): (Value, _) = client.execute(request).await?.json().await?;
    let id = created_record_id(created)?;

    debug!(record = %id, shared = note.is_shared(), "Created note record");
    Ok(wrap(id, renewed))
}

/// Deletes a note record
pub async fn delete(
    client: &HatClient,
    token: &AccessToken,
    id: &NoteId,
) -> Result<Renewable<()>, HatError> {
    let request = client
        .request(Method::DELETE, "/api/v2/data", token)
        .query(&[("records", id.as_str())]);

    let reply = client.execute(request).await?;
    debug!(record = %id, "Deleted note record");
    Ok(reply.into_renewable(()))
}

fn wrap<T>(value: T, renewed: Option<AccessToken>) -> Renewable<T> {
    match renewed {
        Some(token) => Renewable::renewed(value, token),
        None => Renewable::new(value),
    }
}
