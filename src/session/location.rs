//! Campus locations a session can be held at

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The fixed set of campus study spots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "Borchardt Library")]
    BorchardtLibrary,
    #[serde(rename = "Donald Whitehead Building")]
    DonaldWhiteheadBuilding,
    #[serde(rename = "Online Learning Zone")]
    OnlineLearningZone,
    #[serde(rename = "The Learning Commons (TLC)")]
    LearningCommons,
    #[serde(rename = "The Agora")]
    Agora,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown campus location '{0}'")]
pub struct ParseLocationError(pub String);

impl Location {
    /// Every location, in the order the create form lists them
    pub const ALL: [Location; 5] = [
        Location::BorchardtLibrary,
        Location::DonaldWhiteheadBuilding,
        Location::OnlineLearningZone,
        Location::LearningCommons,
        Location::Agora,
    ];

    /// Label shown to students and stored on the record
    pub fn label(&self) -> &'static str {
        match self {
            Location::BorchardtLibrary => "Borchardt Library",
            Location::DonaldWhiteheadBuilding => "Donald Whitehead Building",
            Location::OnlineLearningZone => "Online Learning Zone",
            Location::LearningCommons => "The Learning Commons (TLC)",
            Location::Agora => "The Agora",
        }
    }

    /// Short name accepted on the command line
    pub fn alias(&self) -> &'static str {
        match self {
            Location::BorchardtLibrary => "borchardt",
            Location::DonaldWhiteheadBuilding => "whitehead",
            Location::OnlineLearningZone => "online",
            Location::LearningCommons => "tlc",
            Location::Agora => "agora",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Location::ALL
            .into_iter()
            .find(|loc| {
                loc.label().eq_ignore_ascii_case(wanted) || loc.alias().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| ParseLocationError(s.to_string()))
    }
}
