use serde::{Deserialize, Serialize};
use std::fmt;

/// The aggregate judgement over one upgrade candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Safe,
    Unsafe,
    ReviewRequired,
    Incomplete,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => write!(f, "SAFE"),
            Self::Unsafe => write!(f, "UNSAFE"),
            Self::ReviewRequired => write!(f, "REVIEW REQUIRED"),
            Self::Incomplete => write!(f, "INCOMPLETE"),
        }
    }
}
