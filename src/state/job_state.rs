/// Crawl job state definitions
///
/// This module defines the lifecycle a crawl job moves through, from the
/// trigger to the final broadcast.
use std::fmt;

/// Represents the current state of a crawl job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Job created, nothing broadcast yet
    Idle,

    /// Start event broadcast
    Starting,

    /// Fetching the first index page to count pages
    Discovering,

    /// Page workers are being dispatched
    Running,

    /// Every worker has finished; outcomes are folded into the summary
    Aggregating,

    // ===== Terminal States =====
    /// Every page reported and the summary was broadcast
    Completed,

    /// A job-fatal error ended the crawl
    Failed,
}

impl JobStatus {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal transition
    ///
    /// The happy path is strictly linear. `Failed` is reachable from every
    /// non-terminal state except `Idle`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        match (self, next) {
            (Self::Idle, Self::Starting)
            | (Self::Starting, Self::Discovering)
            | (Self::Discovering, Self::Running)
            | (Self::Running, Self::Aggregating)
            | (Self::Aggregating, Self::Completed) => true,
            (from, Self::Failed) => !from.is_terminal() && *from != Self::Idle,
            _ => false,
        }
    }

    /// Lowercase name of the state, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::Discovering => "discovering",
            Self::Running => "running",
            Self::Aggregating => "aggregating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
