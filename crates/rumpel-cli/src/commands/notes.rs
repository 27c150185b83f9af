//! Notes commands - list, show, write, edit and delete notes
//!
//! `new` and `edit` drive a [`NoteEditor`] the way a compose screen would:
//! every flag is one user action (type text, flip public, pick a
//! destination, attach a photo), then the note is published.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Subcommand};
use rumpel_core::domain::{
    LocationData, Note, NoteId, NoteKind, PendingImage, ShareDestination, ShareDuration,
};
use rumpel_core::usecases::{DeleteOutcome, NoteEditor, PublishOutcome, ToggleOutcome};
use tracing::info;

use super::{AppContext, Session};
use crate::output::{preview, OutputFormatter};

#[derive(Debug, Subcommand)]
pub enum NotesCommand {
    /// List notes stored on the HAT, most recent first
    List {
        /// Show at most this many notes
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show one note
    Show {
        /// Record id of the note
        id: String,
    },
    /// Write and publish a new note
    New {
        /// Kind of note: note, blog or list
        #[arg(long, default_value = "note")]
        kind: NoteKind,
        #[command(flatten)]
        changes: NoteChanges,
    },
    /// Edit and republish a note
    Edit {
        /// Record id of the note
        id: String,
        #[command(flatten)]
        changes: NoteChanges,
    },
    /// Delete a note
    Delete {
        /// Record id of the note
        id: String,
    },
}

/// Edits applied to a note before it is published
#[derive(Debug, Args)]
pub struct NoteChanges {
    /// Note text
    #[arg(short, long)]
    message: Option<String>,

    /// Make the note public and share it to a destination (repeatable):
    /// facebook, twitter, marketsquare
    #[arg(long = "share")]
    share: Vec<ShareDestination>,

    /// Stop sharing to a destination (repeatable)
    #[arg(long = "unshare")]
    unshare: Vec<ShareDestination>,

    /// Make the note private
    #[arg(long, conflicts_with = "share")]
    private: bool,

    /// How long the note stays public: 1d, 7d, 14d, 1m or forever
    #[arg(long)]
    duration: Option<ShareDuration>,

    /// Attach an image file
    #[arg(long)]
    image: Option<PathBuf>,

    /// Remove the note's image
    #[arg(long, conflicts_with = "image")]
    remove_image: bool,

    /// Location as LAT,LON[,ACCURACY]; accuracy in metres, default 1
    #[arg(long, value_parser = parse_location, allow_hyphen_values = true)]
    location: Option<LocationData>,

    /// Remove the note's location
    #[arg(long, conflicts_with = "location")]
    clear_location: bool,
}

impl NotesCommand {
    pub async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let fmt = ctx.formatter();
        let session = ctx.session(ctx.domain(None)?);

        match self {
            NotesCommand::List { limit } => execute_list(ctx, &session, &*fmt, *limit).await,
            NotesCommand::Show { id } => execute_show(ctx, &session, &*fmt, id).await,
            NotesCommand::New { kind, changes } => {
                let editor = NoteEditor::new_note(*kind, session.editor_services());
                execute_publish(ctx, &*fmt, editor, changes).await
            }
            NotesCommand::Edit { id, changes } => {
                let note = find_note(&session, id).await?;
                let editor = NoteEditor::edit(note, session.editor_services());
                execute_publish(ctx, &*fmt, editor, changes).await
            }
            NotesCommand::Delete { id } => execute_delete(&session, &*fmt, id).await,
        }
    }
}

async fn find_note(session: &Session, id: &str) -> Result<Note> {
    let id = NoteId::new(id).context("Invalid note id")?;
    Ok(session.list_notes().find(&id).await?)
}

async fn execute_list(
    ctx: &AppContext,
    session: &Session,
    fmt: &dyn OutputFormatter,
    limit: Option<usize>,
) -> Result<()> {
    let mut notes = session.list_notes().list().await?;
    if let Some(limit) = limit {
        notes.truncate(limit);
    }

    if ctx.is_json() {
        fmt.print_json(&serde_json::to_value(&notes).context("Failed to serialize notes")?);
        return Ok(());
    }

    if notes.is_empty() {
        fmt.info("No notes yet");
        return Ok(());
    }
    fmt.success(&format!("{} note(s) on {}", notes.len(), session.domain));
    for note in &notes {
        fmt.info(&summary_line(note));
    }
    Ok(())
}

async fn execute_show(
    ctx: &AppContext,
    session: &Session,
    fmt: &dyn OutputFormatter,
    id: &str,
) -> Result<()> {
    let note = find_note(session, id).await?;

    if ctx.is_json() {
        fmt.print_json(&serde_json::to_value(&note).context("Failed to serialize note")?);
    } else {
        print_note(fmt, &note);
    }
    Ok(())
}

/// Applies `changes` through the editor, then publishes
async fn execute_publish(
    ctx: &AppContext,
    fmt: &dyn OutputFormatter,
    mut editor: NoteEditor,
    changes: &NoteChanges,
) -> Result<()> {
    apply_changes(ctx, fmt, &mut editor, changes).await?;

    let outcome = editor.publish().await?;
    match outcome {
        PublishOutcome::Published(note) => {
            info!(note_id = ?note.id().map(|id| id.as_str()), "Note published");
            if ctx.is_json() {
                fmt.print_json(&serde_json::to_value(&note).context("Failed to serialize note")?);
            } else {
                let id = note.id().map(|id| id.as_str()).unwrap_or("?");
                fmt.success(&format!("Published note {id}"));
                fmt.info(&format!("Sharing:       {}", editor.share_status_label()));
                if note.is_shared() {
                    fmt.info(&format!("Destinations:  {}", destinations(&note)));
                }
            }
            Ok(())
        }
        PublishOutcome::Cancelled => {
            fmt.warn("Not published");
            Ok(())
        }
        PublishOutcome::Abandoned => {
            fmt.warn("Publishing was interrupted");
            Ok(())
        }
        PublishOutcome::Failed(e) => Err(e).context("Publishing failed"),
    }
}

async fn apply_changes(
    ctx: &AppContext,
    fmt: &dyn OutputFormatter,
    editor: &mut NoteEditor,
    changes: &NoteChanges,
) -> Result<()> {
    if let Some(message) = &changes.message {
        editor.set_message(message.as_str());
    }

    if changes.private && editor.toggle_public(false).await == ToggleOutcome::Reverted {
        fmt.warn("The note stays public");
    }

    if !changes.share.is_empty() && !editor.note().is_shared() {
        editor.toggle_public(true).await;
    }
    for destination in &changes.share {
        if editor.note().shared_on().contains(*destination) {
            continue;
        }
        match editor.toggle_destination(*destination).await {
            ToggleOutcome::Applied => {
                fmt.info(&format!("Sharing to {}", destination.display_name()))
            }
            ToggleOutcome::Reverted => fmt.warn(&format!(
                "{} was not added as a destination",
                destination.display_name()
            )),
        }
    }
    for destination in &changes.unshare {
        if editor.note().shared_on().contains(*destination) {
            editor.toggle_destination(*destination).await;
        }
    }

    if let Some(duration) = changes.duration {
        editor.set_share_duration(duration);
    }

    if changes.remove_image {
        editor.remove_image();
    }
    if let Some(path) = &changes.image {
        let max_bytes = max_upload_bytes(ctx.config.upload.max_size_mb);
        editor.attach_image(read_image(path, max_bytes).await?);
    }

    if changes.clear_location {
        editor.clear_location();
    }
    if let Some(location) = changes.location {
        editor.set_location(location);
    }
    Ok(())
}

async fn execute_delete(session: &Session, fmt: &dyn OutputFormatter, id: &str) -> Result<()> {
    let note = find_note(session, id).await?;
    let mut editor = NoteEditor::edit(note, session.editor_services());

    match editor.delete().await? {
        DeleteOutcome::Deleted => fmt.success(&format!("Deleted note {id}")),
        DeleteOutcome::NothingToDelete => fmt.info("Nothing to delete"),
        DeleteOutcome::Cancelled => fmt.warn("Not deleted"),
        DeleteOutcome::Abandoned => fmt.warn("Deleting was interrupted"),
        DeleteOutcome::Failed(e) => return Err(e).context("Deleting failed"),
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Accuracy used when `--location` gives only coordinates
///
/// Stored notes with a zero accuracy read back without a location.
const DEFAULT_ACCURACY_M: f64 = 1.0;

fn parse_location(raw: &str) -> Result<LocationData, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let number = |s: &str| {
        s.parse::<f64>()
            .map_err(|_| format!("'{s}' is not a number"))
    };

    let (latitude, longitude, accuracy) = match parts.as_slice() {
        [lat, lon] => (number(lat)?, number(lon)?, DEFAULT_ACCURACY_M),
        [lat, lon, acc] => (number(lat)?, number(lon)?, number(acc)?),
        _ => return Err("expected LAT,LON or LAT,LON,ACCURACY".into()),
    };
    LocationData::new(latitude, longitude, accuracy).map_err(|e| e.to_string())
}

fn max_upload_bytes(max_size_mb: u64) -> u64 {
    max_size_mb.saturating_mul(1024 * 1024)
}

/// Expands a leading `~/` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

fn content_type(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

async fn read_image(path: &Path, max_bytes: u64) -> Result<PendingImage> {
    let path = expand_home(path);
    let Some(content_type) = content_type(&path) else {
        bail!("{} is not a supported image (jpg, png, gif, heic, webp)", path.display());
    };

    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if bytes.is_empty() {
        bail!("{} is empty", path.display());
    }
    if bytes.len() as u64 > max_bytes {
        bail!(
            "{} is larger than the {} MiB upload limit",
            path.display(),
            max_bytes / (1024 * 1024)
        );
    }

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(PendingImage::new(name, content_type, bytes))
}

fn destinations(note: &Note) -> String {
    let names: Vec<&str> = note.shared_on().iter().map(|d| d.display_name()).collect();
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn summary_line(note: &Note) -> String {
    let id = note.id().map(|id| id.as_str()).unwrap_or("-");
    let sharing = if note.is_shared() {
        format!("{} \u{2192} {}", note.share_status(Utc::now()), destinations(note))
    } else {
        "Private".to_string()
    };
    format!(
        "{id}  [{}]  {sharing}  {}",
        note.kind(),
        preview(note.message(), 50)
    )
}

fn print_note(fmt: &dyn OutputFormatter, note: &Note) {
    let id = note.id().map(|id| id.as_str()).unwrap_or("-");
    fmt.success(&format!("Note {id} ({})", note.kind()));
    fmt.info(&format!(
        "Updated:       {}",
        note.updated_time().format("%Y-%m-%d %H:%M UTC")
    ));
    fmt.info(&format!("Sharing:       {}", note.share_status(Utc::now())));
    if note.is_shared() {
        fmt.info(&format!("Destinations:  {}", destinations(note)));
    }
    if let Some(photo) = note.photo() {
        fmt.info(&format!("Photo:         {}", photo.link));
    }
    if let Some(location) = note.location() {
        fmt.info(&format!(
            "Location:      {:.5}, {:.5} (\u{b1}{}m)",
            location.latitude, location.longitude, location.accuracy
        ));
    }
    fmt.info("");
    for line in note.message().lines() {
        fmt.info(line);
    }
}
