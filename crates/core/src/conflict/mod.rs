//! Merge conflict detection and forced resolution.
//!
//! 1. **Detection** -- read conflicted paths from the index, typed by which
//!    stages are present.
//! 2. **Resolution** -- resolve every conflicted path in favour of the
//!    incoming branch, then reset the working tree to the index.

pub mod detector;
pub mod resolver;

pub use detector::{detect_conflicts, ConflictKind, ConflictedPath, IndexSide};
pub use resolver::{force_resolve_incoming, Resolution, ResolvedPath};
