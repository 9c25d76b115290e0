//! Pre-flight guard against clobbering unfinished work.
//!
//! Checks run in a fixed order. An in-progress git merge always wins and is
//! an error. A saved workflow state is reported as stale. A pending
//! changelog without saved state is reported as orphaned. The last two are
//! mutually exclusive because the orphan check requires the state file to
//! be absent.

use std::fmt;
use std::path::Path;

use tracing::{debug, warn};

use crate::changelog::pending_path;
use crate::console::{Console, Tone};
use crate::errors::{CoreError, PromptError, WorkflowError};
use crate::git::GitClient;
use crate::state::{StateFile, WorkflowState};

/// What the guard found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preflight {
    Clean,
    /// A saved workflow from an earlier run.
    Stale(WorkflowState),
    /// A pending changelog with no saved workflow.
    Orphaned,
}

/// Inspect the repository. Read-only.
pub fn inspect(git: &GitClient, state_file: &StateFile) -> Result<Preflight, CoreError> {
    if git.merge_in_progress() {
        return Err(WorkflowError::MergeInProgress.into());
    }
    if let Some(state) = state_file.load()? {
        warn!(branch = %state.branch, target = %state.target, "found saved workflow state");
        return Ok(Preflight::Stale(state));
    }
    if pending_path(git.workdir()).exists() {
        warn!("found pending changelog without workflow state");
        return Ok(Preflight::Orphaned);
    }
    debug!("pre-flight clean");
    Ok(Preflight::Clean)
}

/// Menu for a saved workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleChoice {
    Restart,
    Continue,
    Abort,
}

impl StaleChoice {
    pub const ALL: [StaleChoice; 3] = [Self::Restart, Self::Continue, Self::Abort];
}

impl fmt::Display for StaleChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restart => write!(f, "Remove the saved state and start over"),
            Self::Continue => write!(f, "Continue from the saved state"),
            Self::Abort => write!(f, "Abort"),
        }
    }
}

/// Menu for an orphaned pending changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrphanChoice {
    Restart,
    CompletePrevious,
    Abort,
}

impl OrphanChoice {
    pub const ALL: [OrphanChoice; 3] = [Self::Restart, Self::CompletePrevious, Self::Abort];
}

impl fmt::Display for OrphanChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restart => write!(f, "Remove the pending changelog and start over"),
            Self::CompletePrevious => {
                write!(f, "Complete the previous merge (rename and commit the changelog)")
            }
            Self::Abort => write!(f, "Abort"),
        }
    }
}

/// Ask from a fixed menu whose last entry is the abort choice.
///
/// Non-interactive consoles and cancelled prompts get the abort choice.
fn choose<T: Copy + fmt::Display>(
    console: &dyn Console,
    prompt: &str,
    options: &[T],
) -> Result<T, PromptError> {
    let abort = options.len() - 1;
    if !console.is_interactive() {
        return Ok(options[abort]);
    }
    let labels: Vec<String> = options.iter().map(ToString::to_string).collect();
    let picked = console.select(prompt, &labels, abort)?;
    Ok(options[picked.filter(|i| *i < options.len()).unwrap_or(abort)])
}

pub fn choose_stale(
    console: &dyn Console,
    state: &WorkflowState,
) -> Result<StaleChoice, PromptError> {
    console.say(
        Tone::Warning,
        &format!(
            "An unfinished changelog workflow was found ({} -> {}, stage: {}).",
            state.branch,
            state.target,
            state
                .stage()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string()),
        ),
    );
    choose(console, "What would you like to do?", &StaleChoice::ALL)
}

pub fn choose_orphan(console: &dyn Console, root: &Path) -> Result<OrphanChoice, PromptError> {
    console.say(
        Tone::Warning,
        &format!(
            "A pending changelog exists without a saved workflow: {}",
            pending_path(root).display()
        ),
    );
    choose(console, "What would you like to do?", &OrphanChoice::ALL)
}
