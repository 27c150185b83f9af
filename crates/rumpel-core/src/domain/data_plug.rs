//! Data plugs, offers and uploaded files

use std::fmt;

use serde::{Deserialize, Serialize};

use super::newtypes::FileId;

/// Identifier of the promotional offer bundled with data plug activation
pub const DEFAULT_OFFER_ID: &str = "32dde42f-5df9-4841-8257-5639db222e41";

/// A third-party integration listed in the data plug directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPlug {
    /// Directory name, matched exactly against a destination's plug name
    pub name: String,
    /// Base URL of the plug
    pub url: String,
}

impl DataPlug {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Finds the plug called exactly `name` in a directory listing
    pub fn find<'a>(plugs: &'a [DataPlug], name: &str) -> Option<&'a DataPlug> {
        plugs.iter().find(|plug| plug.name == name)
    }
}

/// Visibility of a file in the HAT file service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileVisibility {
    Public,
    Private,
}

impl FileVisibility {
    /// Public for shared notes, private otherwise
    pub fn for_shared(shared: bool) -> Self {
        if shared {
            FileVisibility::Public
        } else {
            FileVisibility::Private
        }
    }
}

impl fmt::Display for FileVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileVisibility::Public => f.write_str("public"),
            FileVisibility::Private => f.write_str("private"),
        }
    }
}

/// A file produced by the upload step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub file_id: FileId,
    pub visibility: FileVisibility,
}

/// A local image waiting to be uploaded with the note
#[derive(Clone, PartialEq, Eq)]
pub struct PendingImage {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl PendingImage {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for PendingImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingImage")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}
