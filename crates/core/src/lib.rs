//! dev-conventions core library.
//!
//! This crate provides the building blocks of the changelog/merge workflow:
//! configuration, the git client, the persisted workflow state, changelog
//! generation, conflict detection and forced resolution, and the workflow
//! controller that drives a run end to end.

pub mod changelog;
pub mod config;
pub mod conflict;
pub mod console;
pub mod errors;
pub mod git;
pub mod state;
pub mod workflow;

// Re-exports for convenience.
pub use config::ConventionsConfig;
pub use console::{Console, Tone};
pub use git::GitClient;
pub use workflow::{WorkflowController, WorkflowOptions, WorkflowOutcome};
