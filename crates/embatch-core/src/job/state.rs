use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

/// Lifecycle state of a job.
///
/// Transitions are monotonic: `Pending → Started → {Success | Failure}`.
/// Terminal states never change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Accepted but not picked up by a worker yet.
    #[default]
    Pending,
    /// A worker is running the pipeline.
    Started,
    /// The sink accepted the embeddings.
    Success,
    /// The pipeline failed.
    Failure,
}

impl JobState {
    /// Returns `true` for `Success` and `Failure`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    /// Returns `true` if a job in this state may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Started | Self::Success | Self::Failure)
                | (Self::Started, Self::Success | Self::Failure)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(JobState::Pending.can_transition_to(JobState::Started));
        assert!(JobState::Started.can_transition_to(JobState::Success));
        assert!(JobState::Started.can_transition_to(JobState::Failure));
        assert!(JobState::Pending.can_transition_to(JobState::Failure));
    }

    #[test]
    fn test_terminal_states_never_revert() {
        for terminal in [JobState::Success, JobState::Failure] {
            assert!(terminal.is_terminal());
            for next in [
                JobState::Pending,
                JobState::Started,
                JobState::Success,
                JobState::Failure,
            ] {
                assert!(!terminal.can_transition_to(next));
            }
        }
        assert!(!JobState::Started.can_transition_to(JobState::Pending));
        assert!(!JobState::Started.can_transition_to(JobState::Started));
    }

    #[test]
    fn test_wire_format() {
        assert_eq!(JobState::Pending.to_string(), "PENDING");
        assert_eq!(serde_json::to_value(JobState::Failure).unwrap(), "FAILURE");
    }
}
