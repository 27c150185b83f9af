//! Share destinations
//!
//! The fixed set of external sites a note can be shared to, and the
//! rules for reaching their data plugs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::data_plug::DataPlug;
use super::errors::DomainError;
use super::newtypes::HatDomain;

/// An external site a shared note is published to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareDestination {
    Facebook,
    Twitter,
    /// MarketSquare has no data plug; selecting it claims the offer directly
    #[serde(rename = "marketsquare")]
    MarketSquare,
}

impl ShareDestination {
    /// All destinations, in the order they are presented
    pub const ALL: [ShareDestination; 3] = [
        ShareDestination::Facebook,
        ShareDestination::Twitter,
        ShareDestination::MarketSquare,
    ];

    /// Wire name used in the note's `shared_on` field
    pub fn as_str(&self) -> &'static str {
        match self {
            ShareDestination::Facebook => "facebook",
            ShareDestination::Twitter => "twitter",
            ShareDestination::MarketSquare => "marketsquare",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ShareDestination::Facebook => "Facebook",
            ShareDestination::Twitter => "Twitter",
            ShareDestination::MarketSquare => "MarketSquare",
        }
    }

    /// Whether the destination's data plug must be active before sharing
    pub fn requires_data_plug(&self) -> bool {
        !matches!(self, ShareDestination::MarketSquare)
    }

    /// Name of the data plug in the plug directory, if any
    pub fn plug_name(&self) -> Option<&'static str> {
        match self {
            ShareDestination::Facebook => Some("facebook"),
            ShareDestination::Twitter => Some("twitter"),
            ShareDestination::MarketSquare => None,
        }
    }

    /// Builds the HAT login URL that activates `plug` for this destination
    ///
    /// Each plug expects a different redirect path after HAT login.
    pub fn activation_url(&self, domain: &HatDomain, plug: &DataPlug) -> Option<String> {
        let redirect = match self {
            ShareDestination::Facebook => plug.url.replace("dataplug", "hat/authenticate"),
            ShareDestination::Twitter => {
                format!("{}/authenticate/hat", plug.url.trim_end_matches('/'))
            }
            ShareDestination::MarketSquare => return None,
        };

        Some(format!(
            "{}/hatlogin?name={}&redirect={}",
            domain.base_url(),
            self.display_name(),
            redirect
        ))
    }
}

impl fmt::Display for ShareDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShareDestination {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "facebook" => Ok(ShareDestination::Facebook),
            "twitter" => Ok(ShareDestination::Twitter),
            "marketsquare" => Ok(ShareDestination::MarketSquare),
            other => Err(DomainError::UnknownDestination(other.to_string())),
        }
    }
}
