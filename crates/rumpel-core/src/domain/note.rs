//! Note domain entity
//!
//! A note ("notable") is the content entity that gets published to the
//! HAT and optionally shared to external destinations.
//!
//! # Invariants
//! - When `shared` is false, `shared_on` reads as empty and `public_until`
//!   reads as `None`, whatever the stored values are.
//! - `shared_on` holds each destination at most once, in selection order.
//! - A location read back from the HAT is present only when latitude,
//!   longitude and accuracy are all non-zero. A location set while editing
//!   is kept as given.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::destination::ShareDestination;
use super::errors::DomainError;
use super::newtypes::NoteId;

// ============================================================================
// NoteKind
// ============================================================================

/// The kind of note, chosen when the note is started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteKind {
    #[default]
    Note,
    Blog,
    List,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Note => "note",
            NoteKind::Blog => "blog",
            NoteKind::List => "list",
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "note" => Ok(NoteKind::Note),
            "blog" => Ok(NoteKind::Blog),
            "list" => Ok(NoteKind::List),
            other => Err(DomainError::UnknownKind(other.to_string())),
        }
    }
}

// ============================================================================
// SharedOn
// ============================================================================

/// Ordered set of destinations a note is shared on
///
/// Serialized as a comma-joined string with a trailing comma
/// (`"facebook,twitter,"`), the format the HAT stores.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedOn(Vec<ShareDestination>);

static EMPTY_SHARED_ON: SharedOn = SharedOn(Vec::new());

impl SharedOn {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Parses the stored string, skipping empty segments and unknown names
    pub fn parse(raw: &str) -> Self {
        let mut shared_on = Self::new();
        for segment in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match segment.parse::<ShareDestination>() {
                Ok(destination) => {
                    shared_on.insert(destination);
                }
                Err(_) => debug!(segment, "Ignoring unknown share destination"),
            }
        }
        shared_on
    }

    /// Adds a destination; returns false if it was already present
    pub fn insert(&mut self, destination: ShareDestination) -> bool {
        if self.contains(destination) {
            return false;
        }
        self.0.push(destination);
        true
    }

    /// Removes a destination; returns false if it was not present
    pub fn remove(&mut self, destination: ShareDestination) -> bool {
        let before = self.0.len();
        self.0.retain(|d| *d != destination);
        before != self.0.len()
    }

    pub fn contains(&self, destination: ShareDestination) -> bool {
        self.0.contains(&destination)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShareDestination> {
        self.0.iter()
    }

    /// The stored representation, e.g. `"facebook,marketsquare,"`
    pub fn to_wire(&self) -> String {
        self.0.iter().map(|d| format!("{},", d.as_str())).collect()
    }
}

impl FromIterator<ShareDestination> for SharedOn {
    fn from_iter<T: IntoIterator<Item = ShareDestination>>(iter: T) -> Self {
        let mut shared_on = Self::new();
        for destination in iter {
            shared_on.insert(destination);
        }
        shared_on
    }
}

impl Serialize for SharedOn {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_wire())
    }
}

impl<'de> Deserialize<'de> for SharedOn {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

// ============================================================================
// Attachments
// ============================================================================

/// Photo attached to a note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoData {
    pub link: String,
}

/// Location attached to a note
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

impl LocationData {
    /// Creates a location, validating coordinate ranges
    pub fn new(latitude: f64, longitude: f64, accuracy: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::InvalidLocation(format!(
                "latitude {latitude} out of range"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::InvalidLocation(format!(
                "longitude {longitude} out of range"
            )));
        }
        if accuracy < 0.0 || !accuracy.is_finite() {
            return Err(DomainError::InvalidLocation(format!(
                "accuracy {accuracy} must be a non-negative number"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            accuracy,
        })
    }

    /// Reads a stored location; zeroed coordinates mean "no location"
    pub fn from_stored(latitude: f64, longitude: f64, accuracy: f64) -> Option<Self> {
        if latitude != 0.0 && longitude != 0.0 && accuracy != 0.0 {
            Some(Self {
                latitude,
                longitude,
                accuracy,
            })
        } else {
            None
        }
    }
}

/// Author of a note as stored in the HAT
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Author {
    pub nick: String,
    pub name: String,
    pub photo_url: String,
    pub phata: String,
    pub id: i64,
}

// ============================================================================
// ShareDuration
// ============================================================================

/// How long a shared note stays public
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareDuration {
    OneDay,
    SevenDays,
    FourteenDays,
    OneMonth,
    Forever,
}

impl ShareDuration {
    pub const ALL: [ShareDuration; 5] = [
        ShareDuration::OneDay,
        ShareDuration::SevenDays,
        ShareDuration::FourteenDays,
        ShareDuration::OneMonth,
        ShareDuration::Forever,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ShareDuration::OneDay => "1 day",
            ShareDuration::SevenDays => "7 days",
            ShareDuration::FourteenDays => "14 days",
            ShareDuration::OneMonth => "1 month",
            ShareDuration::Forever => "Forever",
        }
    }

    /// Expiry for a note shared at `now`; `None` for `Forever`
    pub fn expiry_from(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            ShareDuration::OneDay => Some(now + Duration::days(1)),
            ShareDuration::SevenDays => Some(now + Duration::days(7)),
            ShareDuration::FourteenDays => Some(now + Duration::days(14)),
            ShareDuration::OneMonth => now.checked_add_months(Months::new(1)),
            ShareDuration::Forever => None,
        }
    }
}

impl fmt::Display for ShareDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ShareDuration {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1d" | "1 day" => Ok(ShareDuration::OneDay),
            "7d" | "7 days" => Ok(ShareDuration::SevenDays),
            "14d" | "14 days" => Ok(ShareDuration::FourteenDays),
            "1m" | "1 month" => Ok(ShareDuration::OneMonth),
            "forever" => Ok(ShareDuration::Forever),
            other => Err(DomainError::InvalidDuration(other.to_string())),
        }
    }
}

/// What the "share for" control displays for a note
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareStatus {
    Private,
    Forever,
    SharedUntil(DateTime<Utc>),
    ExpiredOn(DateTime<Utc>),
}

impl fmt::Display for ShareStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareStatus::Private => f.write_str("Private"),
            ShareStatus::Forever => f.write_str("Forever"),
            ShareStatus::SharedUntil(at) => write!(f, "Shared until {}", at.format("%d/%m/%Y")),
            ShareStatus::ExpiredOn(at) => write!(f, "Expired on {}", at.format("%d/%m/%Y")),
        }
    }
}

// ============================================================================
// Note
// ============================================================================

/// A note being written, edited or read back from the HAT
///
/// Serialization goes through [`Note::shared_on`] and
/// [`Note::public_until`], so a private note never writes stale sharing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Note {
    id: Option<NoteId>,
    message: String,
    kind: NoteKind,
    shared: bool,
    shared_on: SharedOn,
    public_until: Option<DateTime<Utc>>,
    photo: Option<PhotoData>,
    location: Option<LocationData>,
    author: Option<Author>,
    created_time: DateTime<Utc>,
    updated_time: DateTime<Utc>,
}

impl Note {
    /// Creates a fresh, unpersisted, private note
    pub fn new(kind: NoteKind) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            message: String::new(),
            kind,
            shared: false,
            shared_on: SharedOn::new(),
            public_until: None,
            photo: None,
            location: None,
            author: None,
            created_time: now,
            updated_time: now,
        }
    }

    // --- builder-style setters used when reading notes back ---

    pub fn with_id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_sharing(
        mut self,
        shared: bool,
        shared_on: SharedOn,
        public_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.shared = shared;
        self.shared_on = shared_on;
        self.public_until = public_until;
        self
    }

    pub fn with_photo_link(mut self, link: impl Into<String>) -> Self {
        self.set_photo_link(link);
        self
    }

    pub fn with_location(mut self, location: Option<LocationData>) -> Self {
        self.location = location;
        self
    }

    pub fn with_author(mut self, author: Author) -> Self {
        self.author = Some(author);
        self
    }

    pub fn with_times(mut self, created: DateTime<Utc>, updated: DateTime<Utc>) -> Self {
        self.created_time = created;
        self.updated_time = updated;
        self
    }

    // --- accessors ---

    pub fn id(&self) -> Option<&NoteId> {
        self.id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> NoteKind {
        self.kind
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Destinations, empty whenever the note is not shared
    pub fn shared_on(&self) -> &SharedOn {
        if self.shared {
            &self.shared_on
        } else {
            &EMPTY_SHARED_ON
        }
    }

    /// Public expiry, `None` whenever the note is not shared
    pub fn public_until(&self) -> Option<DateTime<Utc>> {
        if self.shared {
            self.public_until
        } else {
            None
        }
    }

    pub fn photo(&self) -> Option<&PhotoData> {
        self.photo.as_ref()
    }

    pub fn location(&self) -> Option<&LocationData> {
        self.location.as_ref()
    }

    pub fn author(&self) -> Option<&Author> {
        self.author.as_ref()
    }

    pub fn created_time(&self) -> DateTime<Utc> {
        self.created_time
    }

    pub fn updated_time(&self) -> DateTime<Utc> {
        self.updated_time
    }

    /// What the duration control shows for this note at `now`
    pub fn share_status(&self, now: DateTime<Utc>) -> ShareStatus {
        if !self.shared {
            return ShareStatus::Private;
        }
        match self.public_until {
            Some(until) if until > now => ShareStatus::SharedUntil(until),
            Some(until) => ShareStatus::ExpiredOn(until),
            None => ShareStatus::Forever,
        }
    }

    // --- mutators ---

    pub fn set_id(&mut self, id: Option<NoteId>) {
        self.id = id;
    }

    pub fn set_kind(&mut self, kind: NoteKind) {
        self.kind = kind;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Turns sharing on or off; turning it off clears destinations and expiry
    pub fn set_shared(&mut self, shared: bool) {
        self.shared = shared;
        if !shared {
            self.shared_on.clear();
            self.public_until = None;
        }
    }

    /// Adds a destination; only meaningful while the note is shared
    pub fn add_destination(&mut self, destination: ShareDestination) -> bool {
        self.shared_on.insert(destination)
    }

    pub fn remove_destination(&mut self, destination: ShareDestination) -> bool {
        self.shared_on.remove(destination)
    }

    /// Applies a share duration; `Forever` keeps the current expiry
    pub fn apply_share_duration(&mut self, duration: ShareDuration, now: DateTime<Utc>) {
        if let Some(expiry) = duration.expiry_from(now) {
            self.public_until = Some(expiry);
        }
    }

    pub fn set_public_until(&mut self, until: Option<DateTime<Utc>>) {
        self.public_until = until;
    }

    /// Sets the photo link; an empty link removes the photo
    pub fn set_photo_link(&mut self, link: impl Into<String>) {
        let link = link.into();
        self.photo = if link.is_empty() {
            None
        } else {
            Some(PhotoData { link })
        };
    }

    pub fn clear_photo(&mut self) {
        self.photo = None;
    }

    pub fn set_location(&mut self, location: LocationData) {
        self.location = Some(location);
    }

    pub fn clear_location(&mut self) {
        self.location = None;
    }

    /// Marks the note as modified now
    pub fn touch(&mut self) {
        self.updated_time = Utc::now();
    }
}

impl Serialize for Note {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Note", 11)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("message", &self.message)?;
        state.serialize_field("kind", &self.kind)?;
        state.serialize_field("shared", &self.shared)?;
        state.serialize_field("shared_on", self.shared_on())?;
        state.serialize_field("public_until", &self.public_until())?;
        state.serialize_field("photo", &self.photo)?;
        state.serialize_field("location", &self.location)?;
        state.serialize_field("author", &self.author)?;
        state.serialize_field("created_time", &self.created_time)?;
        state.serialize_field("updated_time", &self.updated_time)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_on_wire_format() {
        let shared_on: SharedOn = [ShareDestination::Facebook, ShareDestination::MarketSquare]
            .into_iter()
            .collect();
        assert_eq!(shared_on.to_wire(), "facebook,marketsquare,");
        assert_eq!(SharedOn::new().to_wire(), "");
    }

    #[test]
    fn test_shared_on_parse_is_lenient() {
        let parsed = SharedOn::parse("facebook,,myspace, twitter,facebook,");
        let names: Vec<_> = parsed.iter().map(|d| d.as_str()).collect();
        assert_eq!(names, vec!["facebook", "twitter"]);
    }

    #[test]
    fn test_shared_on_insert_remove() {
        let mut shared_on = SharedOn::new();
        assert!(shared_on.insert(ShareDestination::Twitter));
        assert!(!shared_on.insert(ShareDestination::Twitter));
        assert!(shared_on.remove(ShareDestination::Twitter));
        assert!(!shared_on.remove(ShareDestination::Twitter));
        assert!(shared_on.is_empty());
    }

    #[test]
    fn test_private_note_reads_empty_destinations() {
        let note = Note::new(NoteKind::Note).with_sharing(
            false,
            SharedOn::parse("facebook,twitter,"),
            Some(Utc::now()),
        );
        assert!(note.shared_on().is_empty());
        assert!(note.public_until().is_none());
    }

    #[test]
    fn test_private_note_survives_serde_roundtrip() {
        let note = Note::new(NoteKind::Blog).with_sharing(
            false,
            SharedOn::parse("facebook,"),
            Some(Utc::now()),
        );

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["shared"], false);
        assert_eq!(value["shared_on"], "");
        assert!(value["public_until"].is_null());

        let restored: Note = serde_json::from_value(value).unwrap();
        assert!(restored.shared_on().is_empty());
        assert_eq!(restored.public_until(), None);
        assert_eq!(restored.kind(), NoteKind::Blog);
    }

    #[test]
    fn test_shared_note_serializes_destinations() {
        let until = Utc::now() + Duration::days(7);
        let note = Note::new(NoteKind::Note).with_sharing(
            true,
            SharedOn::parse("twitter,facebook,"),
            Some(until),
        );

        let value = serde_json::to_value(&note).unwrap();
        assert_eq!(value["shared_on"], "twitter,facebook,");
        let restored: Note = serde_json::from_value(value).unwrap();
        assert_eq!(restored, note);
    }

    #[test]
    fn test_set_shared_false_clears_destinations_and_expiry() {
        let mut note = Note::new(NoteKind::Note);
        note.set_shared(true);
        note.add_destination(ShareDestination::Facebook);
        note.set_public_until(Some(Utc::now()));

        note.set_shared(false);
        note.set_shared(true);
        assert!(note.shared_on().is_empty());
        assert!(note.public_until().is_none());
    }

    #[test]
    fn test_share_duration_expiry() {
        let now = "2026-01-31T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(
            ShareDuration::SevenDays.expiry_from(now).unwrap(),
            "2026-02-07T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        // Month arithmetic clamps to the end of February
        assert_eq!(
            ShareDuration::OneMonth.expiry_from(now).unwrap(),
            "2026-02-28T10:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert!(ShareDuration::Forever.expiry_from(now).is_none());
    }

    #[test]
    fn test_forever_keeps_existing_expiry() {
        let now = Utc::now();
        let mut note = Note::new(NoteKind::Note);
        note.set_shared(true);
        note.apply_share_duration(ShareDuration::OneDay, now);
        let expiry = note.public_until();
        note.apply_share_duration(ShareDuration::Forever, now);
        assert_eq!(note.public_until(), expiry);
    }

    #[test]
    fn test_share_duration_parse() {
        assert_eq!("7d".parse::<ShareDuration>().unwrap(), ShareDuration::SevenDays);
        assert_eq!("1 Month".parse::<ShareDuration>().unwrap(), ShareDuration::OneMonth);
        assert!("3 weeks".parse::<ShareDuration>().is_err());
    }

    #[test]
    fn test_share_status() {
        let now = Utc::now();
        let mut note = Note::new(NoteKind::Note);
        assert_eq!(note.share_status(now), ShareStatus::Private);

        note.set_shared(true);
        assert_eq!(note.share_status(now), ShareStatus::Forever);
        assert_eq!(note.share_status(now).to_string(), "Forever");

        let later = now + Duration::days(2);
        note.set_public_until(Some(later));
        assert_eq!(note.share_status(now), ShareStatus::SharedUntil(later));

        let earlier = now - Duration::days(2);
        note.set_public_until(Some(earlier));
        assert!(note.share_status(now).to_string().starts_with("Expired on"));
    }

    #[test]
    fn test_zeroed_location_is_absent() {
        assert!(LocationData::from_stored(0.0, 0.0, 0.0).is_none());
        assert!(LocationData::from_stored(51.5, 0.0, 5.0).is_none());
        assert!(LocationData::from_stored(51.5, -0.12, 5.0).is_some());
    }

    #[test]
    fn test_set_location_keeps_zero_accuracy() {
        let mut note = Note::new(NoteKind::Note);
        note.set_location(LocationData::new(51.5, -0.12, 0.0).unwrap());

        let location = note.location().copied().unwrap();
        assert_eq!(location.latitude, 51.5);
        assert_eq!(location.longitude, -0.12);
        assert_eq!(location.accuracy, 0.0);
    }

    #[test]
    fn test_location_validation() {
        assert!(LocationData::new(91.0, 0.0, 1.0).is_err());
        assert!(LocationData::new(0.0, 181.0, 1.0).is_err());
        assert!(LocationData::new(0.0, 0.0, -1.0).is_err());
        assert!(LocationData::new(51.5, -0.12, 10.0).is_ok());
    }

    #[test]
    fn test_empty_photo_link_removes_photo() {
        let mut note = Note::new(NoteKind::Note).with_photo_link("https://x/y");
        assert!(note.photo().is_some());
        note.set_photo_link("");
        assert!(note.photo().is_none());
    }

    #[test]
    fn test_note_kind_parse() {
        assert_eq!("Blog".parse::<NoteKind>().unwrap(), NoteKind::Blog);
        assert!("diary".parse::<NoteKind>().is_err());
    }
}
