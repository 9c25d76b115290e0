//! Git operations for dev-conventions.

pub mod client;
pub mod remote_url;

pub use client::{CommitSummary, GitClient, GitOutput};
