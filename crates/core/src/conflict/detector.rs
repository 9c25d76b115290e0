//! Conflict detection from the index.
//!
//! A conflicted path has up to three index entries: the merge base
//! (stage 1), our side (stage 2) and their side (stage 3). Which of them
//! exist determines the conflict kind, matching the two-letter codes that
//! `git status --porcelain` prints.

use std::collections::BTreeMap;
use std::fmt;

use git2::{IndexEntry, Oid};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::GitError;
use crate::git::GitClient;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Shape of a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// `UU`: both sides modified the file.
    BothModified,
    /// `AA`: both sides added the file.
    BothAdded,
    /// `DD`: both sides deleted the file.
    BothDeleted,
    /// `AU`: only our side added the file.
    AddedByUs,
    /// `UA`: only their side added the file.
    AddedByThem,
    /// `DU`: we deleted, they modified.
    DeletedByUs,
    /// `UD`: we modified, they deleted.
    DeletedByThem,
}

impl ConflictKind {
    /// Classify by which stages are present.
    pub fn from_stages(ancestor: bool, ours: bool, theirs: bool) -> Option<Self> {
        match (ancestor, ours, theirs) {
            (true, true, true) => Some(Self::BothModified),
            (false, true, true) => Some(Self::BothAdded),
            (true, false, false) => Some(Self::BothDeleted),
            (false, true, false) => Some(Self::AddedByUs),
            (false, false, true) => Some(Self::AddedByThem),
            (true, false, true) => Some(Self::DeletedByUs),
            (true, true, false) => Some(Self::DeletedByThem),
            (false, false, false) => None,
        }
    }

    /// Porcelain status code.
    pub fn code(self) -> &'static str {
        match self {
            Self::BothModified => "UU",
            Self::BothAdded => "AA",
            Self::BothDeleted => "DD",
            Self::AddedByUs => "AU",
            Self::AddedByThem => "UA",
            Self::DeletedByUs => "DU",
            Self::DeletedByThem => "UD",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::BothModified => "both modified",
            Self::BothAdded => "both added",
            Self::BothDeleted => "both deleted",
            Self::AddedByUs => "added by us",
            Self::AddedByThem => "added by them",
            Self::DeletedByUs => "deleted by us",
            Self::DeletedByThem => "deleted by them",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}

/// One stage entry of a conflicted path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSide {
    pub oid: Oid,
    pub mode: u32,
}

impl From<&IndexEntry> for IndexSide {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            oid: entry.id,
            mode: entry.mode,
        }
    }
}

/// A path the index reports as unmerged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictedPath {
    pub path: String,
    pub kind: ConflictKind,
    pub ancestor: Option<IndexSide>,
    pub ours: Option<IndexSide>,
    pub theirs: Option<IndexSide>,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// List every conflicted path in the index, sorted and deduplicated.
pub fn detect_conflicts(git: &GitClient) -> Result<Vec<ConflictedPath>, GitError> {
    let mut index = git.repo().index()?;
    index.read(false)?;
    if !index.has_conflicts() {
        debug!("index has no conflicts");
        return Ok(Vec::new());
    }

    let mut by_path: BTreeMap<String, ConflictedPath> = BTreeMap::new();
    for conflict in index.conflicts()? {
        let conflict = conflict?;
        let Some(entry) = conflict
            .our
            .as_ref()
            .or(conflict.their.as_ref())
            .or(conflict.ancestor.as_ref())
        else {
            continue;
        };
        let path = String::from_utf8_lossy(&entry.path).to_string();
        let Some(kind) = ConflictKind::from_stages(
            conflict.ancestor.is_some(),
            conflict.our.is_some(),
            conflict.their.is_some(),
        ) else {
            continue;
        };
        by_path.insert(
            path.clone(),
            ConflictedPath {
                path,
                kind,
                ancestor: conflict.ancestor.as_ref().map(IndexSide::from),
                ours: conflict.our.as_ref().map(IndexSide::from),
                theirs: conflict.their.as_ref().map(IndexSide::from),
            },
        );
    }

    info!(count = by_path.len(), "detected conflicted paths");
    Ok(by_path.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_stages() {
        assert_eq!(ConflictKind::from_stages(true, true, true), Some(ConflictKind::BothModified));
        assert_eq!(ConflictKind::from_stages(false, true, true), Some(ConflictKind::BothAdded));
        assert_eq!(ConflictKind::from_stages(true, false, false), Some(ConflictKind::BothDeleted));
        assert_eq!(ConflictKind::from_stages(false, true, false), Some(ConflictKind::AddedByUs));
        assert_eq!(ConflictKind::from_stages(false, false, true), Some(ConflictKind::AddedByThem));
        assert_eq!(ConflictKind::from_stages(true, false, true), Some(ConflictKind::DeletedByUs));
        assert_eq!(ConflictKind::from_stages(true, true, false), Some(ConflictKind::DeletedByThem));
        assert_eq!(ConflictKind::from_stages(false, false, false), None);
    }

    #[test]
    fn test_kind_display_uses_porcelain_code() {
        assert_eq!(ConflictKind::BothModified.to_string(), "UU (both modified)");
        assert_eq!(ConflictKind::DeletedByThem.code(), "UD");
    }
}
