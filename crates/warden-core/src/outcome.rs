//! Final outcome of a gating decision.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the gateway decided for one invocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    /// Forward to the upstream executor.
    Allow,
    /// Refused; never executes.
    Blocked,
    /// Held for a human decision.
    Pending,
    /// Would have been allowed; upstream call simulated.
    DryRun,
}

impl Outcome {
    /// Whether the upstream executor should run.
    #[must_use]
    pub fn executes(self) -> bool {
        matches!(self, Self::Allow)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::Blocked => write!(f, "BLOCKED"),
            Self::Pending => write!(f, "PENDING"),
            Self::DryRun => write!(f, "DRY_RUN"),
        }
    }
}
