//! Persisted progress of an in-flight changelog/merge workflow.
//!
//! The state file is a flat `KEY=VALUE` text file at the repository root.
//! `branch`, `target` and `head` are written once when the workflow starts;
//! `stage` and `merge_head` lines are only ever appended, so the file also
//! records the order in which stages were reached. The file's presence means
//! a workflow is in progress or was interrupted.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::StateError;

/// State file name at the repository root.
pub const STATE_FILE_NAME: &str = ".dev-conventions-merge-state";

/// Pattern appended to `.gitignore` so the state file is never committed.
pub const IGNORE_PATTERN: &str = "/.dev-conventions-merge-state";

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Recorded workflow milestones, in the only order they may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// The generated changelog was committed on the feature branch.
    ChangelogCommitted,
    /// The feature branch was merged into the target.
    Merged,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChangelogCommitted => "changelog_committed",
            Self::Merged => "merged",
        }
    }

    /// The stage that must already be recorded before this one.
    pub fn predecessor(self) -> Option<Stage> {
        match self {
            Self::ChangelogCommitted => None,
            Self::Merged => Some(Self::ChangelogCommitted),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "changelog_committed" => Ok(Self::ChangelogCommitted),
            "merged" => Ok(Self::Merged),
            other => Err(StateError::UnknownStage(other.to_string())),
        }
    }
}

/// Check that `next` may be recorded when `current` is the latest stage.
fn check_order(current: Option<Stage>, next: Stage) -> Result<(), StateError> {
    if current != next.predecessor() {
        return Err(StateError::OutOfOrder {
            previous: current.map_or_else(|| "no stage".to_string(), |s| format!("'{}'", s)),
            next: next.to_string(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// WorkflowState
// ---------------------------------------------------------------------------

/// Typed view of the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Feature branch that started the workflow.
    pub branch: String,
    /// Branch being merged into.
    pub target: String,
    /// Short HEAD hash captured when the changelog was committed.
    pub head: String,
    /// Stages in the order they were recorded.
    pub stages: Vec<Stage>,
    /// Short hash of the merge commit, once it exists.
    pub merge_head: Option<String>,
}

impl WorkflowState {
    pub fn new(
        branch: impl Into<String>,
        target: impl Into<String>,
        head: impl Into<String>,
    ) -> Self {
        Self {
            branch: branch.into(),
            target: target.into(),
            head: head.into(),
            stages: Vec::new(),
            merge_head: None,
        }
    }

    /// Latest recorded stage.
    pub fn stage(&self) -> Option<Stage> {
        self.stages.last().copied()
    }

    /// Parse the `KEY=VALUE` text of a state file.
    pub fn parse(text: &str, origin: &str) -> Result<Self, StateError> {
        let mut branch = None;
        let mut target = None;
        let mut head = None;
        let mut stages: Vec<Stage> = Vec::new();
        let mut merge_head = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| StateError::Malformed {
                line: idx + 1,
                content: raw.to_string(),
            })?;
            let value = value.trim().to_string();
            match key.trim() {
                "branch" => branch = Some(value),
                "target" => target = Some(value),
                "head" => head = Some(value),
                "stage" => {
                    let stage: Stage = value.parse()?;
                    if !stages.contains(&stage) {
                        check_order(stages.last().copied(), stage)?;
                        stages.push(stage);
                    }
                }
                "merge_head" => merge_head = Some(value),
                other => warn!(key = other, origin, "ignoring unknown state key"),
            }
        }

        let missing = |key: &str| StateError::MissingKey {
            path: origin.to_string(),
            key: key.to_string(),
        };
        Ok(Self {
            branch: branch.ok_or_else(|| missing("branch"))?,
            target: target.ok_or_else(|| missing("target"))?,
            head: head.ok_or_else(|| missing("head"))?,
            stages,
            merge_head,
        })
    }

    /// Render the full file contents.
    pub fn render(&self) -> String {
        let mut out = format!(
            "branch={}\ntarget={}\nhead={}\n",
            self.branch, self.target, self.head
        );
        for stage in &self.stages {
            out.push_str(&format!("stage={}\n", stage));
        }
        if let Some(ref merge_head) = self.merge_head {
            out.push_str(&format!("merge_head={}\n", merge_head));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// StateFile
// ---------------------------------------------------------------------------

/// The single state file of a working tree.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

impl StateFile {
    /// State file location for the repository rooted at `root`.
    pub fn in_repo(root: &Path) -> Self {
        Self {
            path: root.join(STATE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the state file, if present.
    pub fn load(&self) -> Result<Option<WorkflowState>, StateError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)?;
        let state = WorkflowState::parse(&text, &self.path.display().to_string())?;
        debug!(
            branch = %state.branch,
            target = %state.target,
            stage = ?state.stage(),
            "loaded workflow state"
        );
        Ok(Some(state))
    }

    /// Write the write-once header of a new workflow.
    pub fn create(&self, state: &WorkflowState) -> Result<(), StateError> {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => {
                    StateError::AlreadyExists(self.path.display().to_string())
                }
                _ => StateError::IoError(e),
            })?;
        file.write_all(state.render().as_bytes())?;
        info!(path = %self.path.display(), "created workflow state");
        Ok(())
    }

    /// Append a `stage=` line, enforcing stage order.
    pub fn append_stage(&self, state: &mut WorkflowState, stage: Stage) -> Result<(), StateError> {
        check_order(state.stage(), stage)?;
        self.append_line(&format!("stage={}", stage))?;
        state.stages.push(stage);
        info!(%stage, "recorded workflow stage");
        Ok(())
    }

    /// Append a `merge_head=` line.
    pub fn record_merge_head(
        &self,
        state: &mut WorkflowState,
        merge_head: &str,
    ) -> Result<(), StateError> {
        self.append_line(&format!("merge_head={}", merge_head))?;
        state.merge_head = Some(merge_head.to_string());
        Ok(())
    }

    fn append_line(&self, line: &str) -> Result<(), StateError> {
        let mut file = OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Delete the state file; a missing file is not an error.
    pub fn remove(&self) -> Result<(), StateError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "removed workflow state");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Append [`IGNORE_PATTERN`] to `.gitignore` unless it is already listed.
///
/// Returns `true` when the file was changed.
pub fn ensure_ignored(root: &Path) -> std::io::Result<bool> {
    let gitignore = root.join(".gitignore");
    let existing = match std::fs::read_to_string(&gitignore) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    if existing.lines().any(|l| l.trim() == IGNORE_PATTERN) {
        return Ok(false);
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&gitignore)?;
    if !existing.is_empty() && !existing.ends_with('\n') {
        writeln!(file)?;
    }
    writeln!(file, "{}", IGNORE_PATTERN)?;
    info!("added state file to .gitignore");
    Ok(true)
}
