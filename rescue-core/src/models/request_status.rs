use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle of a rescue request.
///
/// ```text
/// pending ──► assigned ──► in-progress ──► completed
///    └───────────────────────►┘   └─────────►┘
///                assigned ──────────────────►┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Assigned => "assigned",
            RequestStatus::InProgress => "in-progress",
            RequestStatus::Completed => "completed",
        }
    }

    /// Whether a request in this status may move to `next`.
    ///
    /// Staying in the same status is always allowed so that replayed
    /// updates are harmless.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        use RequestStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Assigned)
                    | (Pending, InProgress)
                    | (Assigned, InProgress)
                    | (Assigned, Completed)
                    | (InProgress, Completed)
            )
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, RequestStatus::Completed)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(RequestStatus::Pending),
            "assigned" => Ok(RequestStatus::Assigned),
            "in-progress" | "in_progress" | "inprogress" => Ok(RequestStatus::InProgress),
            "completed" => Ok(RequestStatus::Completed),
            _ => Err(format!(
                "Invalid status '{}'. Valid options: pending, assigned, in-progress, completed",
                s
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_transitions() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Assigned));
        assert!(Pending.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(InProgress));
        assert!(Assigned.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn test_rejected_transitions() {
        use RequestStatus::*;
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!InProgress.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Assigned,
            RequestStatus::InProgress,
            RequestStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<RequestStatus>().unwrap(), status);
        }
        assert_eq!(
            serde_json::to_string(&RequestStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }
}
