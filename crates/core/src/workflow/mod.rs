//! The changelog/merge workflow.
//!
//! [`controller::WorkflowController`] drives one run: pre-flight checks,
//! target selection, changelog generation and the merge state machine.

pub mod controller;
pub mod preflight;
pub mod target;

use std::path::PathBuf;

use serde::Serialize;

pub use controller::WorkflowController;

/// Per-run options from the command line.
#[derive(Debug, Clone, Default)]
pub struct WorkflowOptions {
    /// Merge target; prompts when absent.
    pub target: Option<String>,
    /// Only rename an existing pending changelog.
    pub rename_only: bool,
    /// Stop after writing the pending changelog.
    pub generate_only: bool,
    /// Merge with `--strategy-option theirs`.
    pub prefer_incoming: bool,
}

/// How a run ended. Only [`WorkflowOutcome::Conflicted`] is a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// Merged, renamed and amended.
    Completed { changelog: PathBuf, merge_head: String },
    /// Pending changelog written, nothing committed.
    Generated { changelog: PathBuf, commits: usize },
    /// Pending changelog renamed outside a full workflow.
    Renamed { changelog: PathBuf },
    /// The operator declined a step; the saved state is kept.
    Paused,
    /// The operator chose to abort at a menu.
    Aborted,
    /// The merge left conflicts for manual resolution.
    Conflicted { files: Vec<String> },
}

impl WorkflowOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Conflicted { .. } => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_conflicts_fail() {
        assert_eq!(WorkflowOutcome::Aborted.exit_code(), 0);
        assert_eq!(WorkflowOutcome::Paused.exit_code(), 0);
        assert_eq!(
            WorkflowOutcome::Conflicted {
                files: vec!["a.txt".into()]
            }
            .exit_code(),
            1
        );
    }
}
