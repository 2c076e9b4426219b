use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdviceKind {
    Fight,
    Trade,
    Avoid,
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AdviceKind::Fight => "fight",
            AdviceKind::Trade => "trade",
            AdviceKind::Avoid => "avoid",
        };
        f.write_str(label)
    }
}

/// Single recommendation derived from the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceVerdict {
    #[serde(rename = "type")]
    pub kind: AdviceKind,
    pub message: String,
    /// Heuristic strength in `0..=100`, not a probability.
    pub confidence: f64,
}
