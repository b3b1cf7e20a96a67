/// Run phase definitions for the harvest state machine
///
/// A run moves `Discovering → Extracting → Finalizing → Completed`. An external
/// interrupt moves any non-terminal phase to `Interrupted`; a fault outside
/// per-item isolation moves it to `Failed`.
use crate::SillageError;
use std::fmt;

/// Represents the current phase of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    // ===== Active Phases =====
    /// Querying the search endpoint for item URLs
    Discovering,

    /// Extracting records from discovered item pages
    Extracting,

    /// Writing the final artifacts
    Finalizing,

    // ===== Terminal Phases =====
    /// Final artifacts were written
    Completed,

    /// An external cancellation stopped the run
    Interrupted,

    /// A run-level fault stopped the run
    Failed,
}

impl RunPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Interrupted | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Self::Interrupted | Self::Failed) => true,
            (Self::Discovering, Self::Extracting) => true,
            (Self::Extracting, Self::Finalizing) => true,
            (Self::Finalizing, Self::Completed) => true,
            _ => false,
        }
    }

    /// Returns the successor phase, or an error if the transition is illegal
    pub fn transition(self, next: RunPhase) -> Result<RunPhase, SillageError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(SillageError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Short lowercase label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Discovering => "discovering",
            Self::Extracting => "extracting",
            Self::Finalizing => "finalizing",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
