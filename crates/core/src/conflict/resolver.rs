//! Forced conflict resolution in favour of the incoming branch.
//!
//! Each conflicted path is resolved by the first rule that applies:
//!
//! 1. the path is gone from the working tree: drop it from the index;
//! 2. the incoming side has a version: take it;
//! 3. only our side added the path: drop it;
//! 4. otherwise the incoming side deleted it: accept the deletion.
//!
//! Afterwards the working tree is reset to the index and untracked debris
//! is removed, so the caller can commit the merge.

use std::fmt;
use std::path::Path;

use tracing::{debug, info};

use super::detector::{ConflictKind, ConflictedPath};
use crate::errors::GitError;
use crate::git::GitClient;

/// Action chosen for one conflicted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The file no longer exists on disk.
    RemoveMissing,
    /// Check out the incoming version.
    TakeIncoming,
    /// Only our side added it; drop it.
    DropOursOnly,
    /// The incoming side deleted it; delete it too.
    AcceptIncomingDeletion,
}

impl Resolution {
    /// Pick the resolution for `conflict`.
    pub fn plan(conflict: &ConflictedPath, exists_on_disk: bool) -> Self {
        if !exists_on_disk {
            Self::RemoveMissing
        } else if conflict.theirs.is_some() {
            Self::TakeIncoming
        } else if conflict.kind == ConflictKind::AddedByUs {
            Self::DropOursOnly
        } else {
            Self::AcceptIncomingDeletion
        }
    }

    /// Whether the path survives the resolution.
    pub fn keeps_path(self) -> bool {
        matches!(self, Self::TakeIncoming)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RemoveMissing => write!(f, "removed (missing on disk)"),
            Self::TakeIncoming => write!(f, "took incoming version"),
            Self::DropOursOnly => write!(f, "removed (added only on our side)"),
            Self::AcceptIncomingDeletion => write!(f, "removed (deleted by incoming)"),
        }
    }
}

/// Outcome for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: String,
    pub resolution: Resolution,
}

/// Resolve every conflict in favour of the incoming side.
pub fn force_resolve_incoming(
    git: &GitClient,
    conflicts: &[ConflictedPath],
) -> Result<Vec<ResolvedPath>, GitError> {
    let mut resolved = Vec::with_capacity(conflicts.len());
    for conflict in conflicts {
        let rel = Path::new(&conflict.path);
        let abs = git.workdir().join(rel);
        let resolution = Resolution::plan(conflict, abs.exists());

        match conflict.theirs.filter(|_| resolution.keeps_path()) {
            Some(theirs) => git.checkout_blob(rel, theirs.oid, theirs.mode)?,
            None => {
                git.remove_from_index(rel)?;
                if abs.is_file() {
                    std::fs::remove_file(&abs)?;
                }
            }
        }
        debug!(path = %conflict.path, %resolution, "resolved conflict");
        resolved.push(ResolvedPath {
            path: conflict.path.clone(),
            resolution,
        });
    }

    git.reset_worktree_to_index()?;
    info!(count = resolved.len(), "forced resolution in favour of incoming changes");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::detector::IndexSide;
    use git2::Oid;

    fn side() -> Option<IndexSide> {
        Some(IndexSide {
            oid: Oid::zero(),
            mode: 0o100644,
        })
    }

    fn conflict(kind: ConflictKind, a: bool, o: bool, t: bool) -> ConflictedPath {
        ConflictedPath {
            path: "f.txt".into(),
            kind,
            ancestor: if a { side() } else { None },
            ours: if o { side() } else { None },
            theirs: if t { side() } else { None },
        }
    }

    #[test]
    fn test_missing_on_disk_wins() {
        let c = conflict(ConflictKind::BothModified, true, true, true);
        assert_eq!(Resolution::plan(&c, false), Resolution::RemoveMissing);
    }

    #[test]
    fn test_incoming_version_preferred() {
        for c in [
            conflict(ConflictKind::BothModified, true, true, true),
            conflict(ConflictKind::BothAdded, false, true, true),
            conflict(ConflictKind::DeletedByUs, true, false, true),
            conflict(ConflictKind::AddedByThem, false, false, true),
        ] {
            assert_eq!(Resolution::plan(&c, true), Resolution::TakeIncoming, "{:?}", c.kind);
        }
    }

    #[test]
    fn test_ours_only_addition_is_dropped() {
        let c = conflict(ConflictKind::AddedByUs, false, true, false);
        assert_eq!(Resolution::plan(&c, true), Resolution::DropOursOnly);
    }

    #[test]
    fn test_incoming_deletion_is_accepted() {
        let c = conflict(ConflictKind::DeletedByThem, true, true, false);
        let plan = Resolution::plan(&c, true);
        assert_eq!(plan, Resolution::AcceptIncomingDeletion);
        assert!(!plan.keeps_path());
    }
}
