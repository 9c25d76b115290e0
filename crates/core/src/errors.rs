//! Error types for the dev-conventions core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git operations (git2 queries and `git` invocations).
#[derive(Debug, Error)]
pub enum GitError {
    /// The path is not inside a git working tree.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// A bare repository has no working tree to operate on.
    #[error("repository at '{0}' has no working tree")]
    BareRepository(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),

    /// A ref (branch, tag, SHA) could not be resolved.
    #[error("git ref not found: {0}")]
    RefNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("git {command} failed (exit {exit_code}): {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// The `git` binary could not be spawned.
    #[error("git binary not available: {0}")]
    BinaryNotFound(String),

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Workflow state file errors
// ---------------------------------------------------------------------------

/// Errors from the persisted workflow state file.
#[derive(Debug, Error)]
pub enum StateError {
    /// A required key is missing from the state file.
    #[error("state file '{path}' is missing required key '{key}'")]
    MissingKey { path: String, key: String },

    /// A `stage=` line carries an unknown value.
    #[error("unknown workflow stage '{0}'")]
    UnknownStage(String),

    /// A stage was appended out of order.
    #[error("stage '{next}' cannot follow {previous}")]
    OutOfOrder { previous: String, next: String },

    /// A line is not a `KEY=VALUE` pair.
    #[error("malformed state line {line}: '{content}'")]
    Malformed { line: usize, content: String },

    /// Attempted to create a state file that already exists.
    #[error("state file already exists at '{0}'")]
    AlreadyExists(String),

    /// Generic I/O error.
    #[error("state file I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Changelog errors
// ---------------------------------------------------------------------------

/// Errors from changelog generation, archiving and renaming.
#[derive(Debug, Error)]
pub enum ChangelogError {
    /// Both the pending and the permanent document exist.
    #[error("'{pending}' and '{permanent}' both exist")]
    Collision { pending: String, permanent: String },

    /// Underlying git failure while collecting commits or stats.
    #[error("changelog git error: {0}")]
    GitError(#[from] GitError),

    /// Generic I/O error.
    #[error("changelog I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Workflow precondition errors
// ---------------------------------------------------------------------------

/// Precondition violations that stop the workflow before it mutates anything.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// A repository-level merge is in progress.
    #[error(
        "a git merge is already in progress; resolve it and commit, or run \
         'git merge --abort' before starting a new changelog cycle"
    )]
    MergeInProgress,

    /// HEAD does not point at a branch.
    #[error("HEAD is detached; check out a branch first")]
    DetachedHead,

    /// The selected target is the current branch.
    #[error("already on target branch '{0}'")]
    AlreadyOnTarget(String),

    /// `target..HEAD` contains no non-merge commits.
    #[error("no commits between '{target}' and '{branch}'")]
    NoCommitsInRange { target: String, branch: String },

    /// Rename-only mode without a pending changelog.
    #[error("no pending changelog found at '{0}'")]
    NoPendingChangelog(String),

    /// A menu answer that is neither an index nor a known name.
    #[error("invalid branch selection '{0}'")]
    InvalidSelection(String),

    /// No conventional target branch exists on the remote or locally.
    #[error("no target branch candidates found ({0}); pass --target explicitly")]
    NoTargetCandidates(String),

    /// Rename-only mode while a workflow is still in flight.
    #[error("a merge workflow is in progress ({0}); finish it or start a new cycle")]
    ActiveWorkflow(String),
}

// ---------------------------------------------------------------------------
// Prompt errors
// ---------------------------------------------------------------------------

/// Errors from the operator console.
#[derive(Debug, Error)]
pub enum PromptError {
    /// The prompt backend failed to read input.
    #[error("failed to read operator input: {0}")]
    Io(String),

    /// A non-interactive console was asked for a value with no default.
    #[error("'{0}' requires an answer but no terminal is attached")]
    NoDefault(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = GitError::RepositoryNotFound("/tmp/repo".into());
        assert_eq!(err.to_string(), "git repository not found at '/tmp/repo'");

        let err = WorkflowError::AlreadyOnTarget("main".into());
        assert_eq!(err.to_string(), "already on target branch 'main'");

        let err = StateError::OutOfOrder {
            previous: "nothing".into(),
            next: "merged".into(),
        };
        assert!(err.to_string().contains("merged"));

        let err = GitError::CommandFailed {
            command: "merge".into(),
            exit_code: 1,
            stderr: "CONFLICT".into(),
        };
        assert!(err.to_string().starts_with("git merge failed"));
    }

    #[test]
    fn test_core_error_from_subsystem() {
        let core_err: CoreError = WorkflowError::DetachedHead.into();
        assert!(matches!(core_err, CoreError::Workflow(_)));

        let core_err: CoreError = StateError::UnknownStage("x".into()).into();
        assert!(matches!(core_err, CoreError::State(_)));
    }
}
