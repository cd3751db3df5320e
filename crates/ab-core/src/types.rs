//! Record types shared by ingestion, inference and reporting.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Experimental condition a user was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arm {
    /// Existing experience (`control`).
    Control,
    /// Redesigned experience (`treatment`).
    Treatment,
}

impl Arm {
    /// Both arms, control first.
    pub const ALL: [Arm; 2] = [Arm::Control, Arm::Treatment];

    /// Label as it appears in the interaction log.
    pub fn as_str(&self) -> &'static str {
        match self {
            Arm::Control => "control",
            Arm::Treatment => "treatment",
        }
    }

    /// The page variant this arm is supposed to be shown.
    pub fn expected_variant(&self) -> PageVariant {
        match self {
            Arm::Control => PageVariant::OldPage,
            Arm::Treatment => PageVariant::NewPage,
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Arm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "control" => Ok(Arm::Control),
            "treatment" => Ok(Arm::Treatment),
            other => Err(Error::Validation(format!(
                "unknown group '{other}' (expected control or treatment)"
            ))),
        }
    }
}

/// Page actually shown to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageVariant {
    /// `old_page`
    OldPage,
    /// `new_page`
    NewPage,
}

impl PageVariant {
    /// Label as it appears in the interaction log.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageVariant::OldPage => "old_page",
            PageVariant::NewPage => "new_page",
        }
    }
}

impl fmt::Display for PageVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageVariant {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "old_page" => Ok(PageVariant::OldPage),
            "new_page" => Ok(PageVariant::NewPage),
            other => Err(Error::Validation(format!(
                "unknown landing_page '{other}' (expected old_page or new_page)"
            ))),
        }
    }
}

/// One row of the interaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// User key.
    pub user_id: u64,
    /// Visit time.
    pub timestamp: NaiveDateTime,
    /// Assigned arm.
    pub group: Arm,
    /// Page shown.
    pub landing_page: PageVariant,
    /// Whether the visit converted.
    pub converted: bool,
}

impl InteractionRecord {
    /// `true` when the page shown matches the assigned arm.
    pub fn is_consistent(&self) -> bool {
        self.group.expected_variant() == self.landing_page
    }
}

/// One row of the user → country mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// User key.
    pub user_id: u64,
    /// Country code (e.g. `US`).
    pub country: String,
}

/// Interaction record extended with the user's country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinedRecord {
    /// The cleaned interaction.
    #[serde(flatten)]
    pub interaction: InteractionRecord,
    /// Country of the user.
    pub country: String,
}

impl JoinedRecord {
    /// Assigned arm.
    pub fn arm(&self) -> Arm {
        self.interaction.group
    }

    /// Conversion outcome.
    pub fn converted(&self) -> bool {
        self.interaction.converted
    }
}
