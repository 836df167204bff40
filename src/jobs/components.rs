//! Shared job-related enums: currencies, action types and display methods.
use serde::{Deserialize, Serialize};

/// Payable resources, each with its own configured cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Money,
    Points,
    Experience,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Money, Currency::Points, Currency::Experience];

    pub fn label(self) -> &'static str {
        match self {
            Self::Money => "money",
            Self::Points => "points",
            Self::Experience => "exp",
        }
    }
}

/// Actions players perform that jobs and quests recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Gather,
    Craft,
    Trade,
    Hunt,
    Fish,
    Build,
}

impl ActionType {
    /// Stable wire name used by the quest-progress codec.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gather => "GATHER",
            Self::Craft => "CRAFT",
            Self::Trade => "TRADE",
            Self::Hunt => "HUNT",
            Self::Fish => "FISH",
            Self::Build => "BUILD",
        }
    }

    /// Reverses `name()`, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "GATHER" => Some(Self::Gather),
            "CRAFT" => Some(Self::Craft),
            "TRADE" => Some(Self::Trade),
            "HUNT" => Some(Self::Hunt),
            "FISH" => Some(Self::Fish),
            "BUILD" => Some(Self::Build),
            _ => None,
        }
    }
}

/// How a job contributes to the player's displayed honorific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMethod {
    None,
    #[default]
    Full,
    Title,
    Job,
    ShortFull,
    ShortTitle,
    ShortJob,
    ShortTitleJob,
    TitleShortJob,
}
