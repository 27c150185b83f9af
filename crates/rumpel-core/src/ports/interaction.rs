//! Interaction ports (driving-side collaborators the core calls back into)
//!
//! The use cases never render anything themselves. They ask the user to
//! confirm, show alerts, open authorization pages and report progress
//! through [`Interaction`], and run interactive login through
//! [`AuthSurface`].
//!
//! The constructors on [`Prompt`] and [`Alert`] carry the exact wording
//! shown to the user.

use crate::domain::{AccessToken, HatDomain, ShareDestination};

// ============================================================================
// Prompts and alerts
// ============================================================================

/// A two-button confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub title: String,
    pub message: String,
    pub cancel_label: String,
    pub proceed_label: String,
}

impl Prompt {
    pub fn new(
        title: impl Into<String>,
        message: impl Into<String>,
        cancel_label: impl Into<String>,
        proceed_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            cancel_label: cancel_label.into(),
            proceed_label: proceed_label.into(),
        }
    }

    /// Shown before publishing a shared note
    pub fn share_now() -> Self {
        Self::new(
            "",
            "You are about to share your post. \n\nTip: to remove a note from the external site, edit the note and make it private.",
            "Cancel",
            "Share now",
        )
    }

    /// Shown before republishing an edited note that was already shared
    pub fn edit_not_propagated() -> Self {
        Self::new(
            "",
            "Your post would not be edited at the destination.",
            "Cancel",
            "OK",
        )
    }

    /// Shown before deleting a note that was already shared
    pub fn delete_shared_note() -> Self {
        Self::new(
            "",
            "Deleting a note that has already been shared will not delete it at the destination. \n\nTo remove a note from the external site, first make it private. You may then choose to delete it.",
            "Cancel",
            "Proceed",
        )
    }

    /// Shown when sharing is switched off on a shared note
    pub fn make_private() -> Self {
        Self::new(
            "",
            "This will remove your post at the shared destinations. \n\nWarning: any comments at the destinations would also be deleted.",
            "Cancel",
            "Proceed",
        )
    }

    /// Offers to activate the data plug of `destination`
    pub fn enable_data_plug(destination: ShareDestination) -> Self {
        let name = destination.display_name();
        Self::new(
            "Data plug not enabled",
            format!(
                "You have to enable {name} data plug before sharing on {name}, do you want to enable now?"
            ),
            "No",
            "Yes",
        )
    }
}

/// A single-button notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn missing_destination() -> Self {
        Self::new("", "Please select at least one shared destination")
    }

    pub fn upload_failed() -> Self {
        Self::new(
            "Upload failed",
            "There was an error with the uploading of the file, please try again later",
        )
    }

    pub fn data_plug_check_failed() -> Self {
        Self::new(
            "Failed checking Data plug",
            "There was an error checking for data plug. Please try again later.",
        )
    }

    pub fn offer_claim_failed() -> Self {
        Self::new(
            "Error enabling offer",
            "There was a problem enabling offer. Please try again later",
        )
    }
}

/// The user's answer to a [`Prompt`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Cancel,
    Proceed,
}

impl Choice {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Choice::Proceed)
    }
}

// ============================================================================
// Interaction trait
// ============================================================================

/// Port trait for user-facing confirmations, alerts and progress
///
/// ## Implementation Notes
///
/// - `present_authorization` returns once the user is back from the
///   external page, or with an error if the page could not be opened.
/// - `progress` receives a fraction in `0.0..=1.0` and must not block.
#[async_trait::async_trait]
pub trait Interaction: Send + Sync {
    /// Asks the user to confirm; resolves with their choice
    async fn confirm(&self, prompt: &Prompt) -> Choice;

    /// Shows a notice and waits for it to be dismissed
    async fn alert(&self, alert: &Alert);

    /// Opens an external authorization page and waits for the user to return
    async fn present_authorization(&self, url: &str) -> anyhow::Result<()>;

    /// Reports upload progress
    fn progress(&self, fraction: f64);
}

// ============================================================================
// AuthSurface trait
// ============================================================================

/// Result of an interactive login
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Authorized(AccessToken),
    Cancelled,
}

/// Port trait for the interactive HAT login flow
#[async_trait::async_trait]
pub trait AuthSurface: Send + Sync {
    /// Runs the login flow for `domain`
    ///
    /// Errors mean the flow could not run at all (e.g. no browser or the
    /// callback listener failed); a user who backs out yields
    /// `AuthResult::Cancelled`.
    async fn reauthorize(&self, domain: &HatDomain) -> anyhow::Result<AuthResult>;
}
