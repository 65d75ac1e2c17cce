// src/engine/difficulty.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Question difficulty, totally ordered `Easy < Medium < Hard`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// Order used to pick the very first question of a session.
pub const SEED_ORDER: [Difficulty; 3] = [Difficulty::Medium, Difficulty::Easy, Difficulty::Hard];

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// One step up, clamped at `Hard`.
    pub fn harder(self) -> Self {
        match self {
            Difficulty::Easy => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Hard => Difficulty::Hard,
        }
    }

    /// One step down, clamped at `Easy`.
    pub fn easier(self) -> Self {
        match self {
            Difficulty::Hard => Difficulty::Medium,
            Difficulty::Medium | Difficulty::Easy => Difficulty::Easy,
        }
    }

    /// Buckets to try, in order, when this difficulty is the draw target.
    pub fn fallback_chain(self) -> [Difficulty; 3] {
        match self {
            Difficulty::Hard => [Difficulty::Hard, Difficulty::Medium, Difficulty::Easy],
            Difficulty::Easy => [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard],
            Difficulty::Medium => [Difficulty::Medium, Difficulty::Hard, Difficulty::Easy],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDifficultyError(pub String);

impl fmt::Display for ParseDifficultyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown difficulty '{}'", self.0)
    }
}

impl std::error::Error for ParseDifficultyError {}

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(ParseDifficultyError(s.to_string())),
        }
    }
}
