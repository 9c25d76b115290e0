//! Changelog generation, archiving and renaming.
//!
//! A cycle produces one pending document at a fixed name. Once the merge
//! commit exists the pending document is renamed to carry the merge hash,
//! and its placeholder is replaced with that hash. Permanent documents from
//! earlier cycles are moved into the archive directory whenever a new cycle
//! generates.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::config::ChangelogConfig;
use crate::errors::{ChangelogError, CoreError, WorkflowError};
use crate::git::remote_url::{commit_url, derive_web_base_url};
use crate::git::{CommitSummary, GitClient};

/// Pending changelog file name at the repository root.
pub const PENDING_CHANGELOG: &str = "CHANGELOG-PENDING.md";

/// Prefix of every changelog document.
pub const CHANGELOG_PREFIX: &str = "CHANGELOG-";

/// Directory collecting superseded permanent changelogs.
pub const ARCHIVE_DIR: &str = "changelog-archive";

/// Stand-in for the merge hash until the merge commit exists.
pub const MERGE_HASH_PLACEHOLDER: &str = "{{MERGE_HASH}}";

const PERMANENT_GLOB: &str = "CHANGELOG-*.md";

/// Permanent document name for a merge hash.
pub fn permanent_name(short_hash: &str) -> String {
    format!("{}{}.md", CHANGELOG_PREFIX, short_hash)
}

pub fn pending_path(root: &Path) -> PathBuf {
    root.join(PENDING_CHANGELOG)
}

pub fn permanent_path(root: &Path, short_hash: &str) -> PathBuf {
    root.join(permanent_name(short_hash))
}

/// Permanent changelog documents at the repository root, sorted by name.
pub fn permanent_documents(root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name != PENDING_CHANGELOG && glob_match::glob_match(PERMANENT_GLOB, &name) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// How the source branch relates to the target at generation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeType {
    /// The target is an ancestor of the source branch.
    FastForward,
    /// The branches have diverged.
    MergeCommit,
}

impl fmt::Display for MergeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FastForward => write!(f, "Fast-forward"),
            Self::MergeCommit => write!(f, "Merge commit"),
        }
    }
}

/// Everything a changelog document is rendered from.
#[derive(Debug, Clone)]
pub struct ChangelogInput {
    pub date: String,
    pub branch: String,
    pub target: String,
    pub merge_type: MergeType,
    pub commits: Vec<CommitSummary>,
    pub diff_stat: String,
    /// Browsable repository URL for commit links.
    pub web_base: Option<String>,
    pub stat_line_limit: usize,
}

/// Render the markdown document.
pub fn render(input: &ChangelogInput) -> String {
    let mut out = String::new();
    out.push_str("# Changelog\n\n");
    out.push_str(&format!("- **Date:** {} (UTC)\n", input.date));
    out.push_str(&format!("- **Source branch:** `{}`\n", input.branch));
    out.push_str(&format!("- **Target branch:** `{}`\n", input.target));
    out.push_str(&format!("- **Merge type:** {}\n", input.merge_type));
    out.push_str(&format!("- **Merge commit:** `{}`\n", MERGE_HASH_PLACEHOLDER));
    out.push('\n');

    out.push_str(&format!("## Commits ({})\n\n", input.commits.len()));
    for commit in &input.commits {
        out.push_str(&render_commit_line(commit, input.web_base.as_deref()));
        out.push('\n');
    }
    out.push('\n');

    out.push_str("## Files changed\n\n```text\n");
    let stat = truncate_lines(input.diff_stat.trim_end(), input.stat_line_limit);
    if !stat.is_empty() {
        out.push_str(&stat);
        out.push('\n');
    }
    out.push_str("```\n");
    out
}

fn render_commit_line(commit: &CommitSummary, web_base: Option<&str>) -> String {
    match web_base {
        Some(base) => format!(
            "- {} ([{}]({}))",
            commit.subject,
            commit.short_sha,
            commit_url(base, &commit.sha)
        ),
        None => format!("- {} (`{}`)", commit.subject, commit.short_sha),
    }
}

/// Keep at most `limit` lines, noting how many were dropped.
fn truncate_lines(text: &str, limit: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= limit {
        return lines.join("\n");
    }
    let mut kept = lines[..limit].join("\n");
    kept.push_str(&format!("\n... ({} more lines truncated)", lines.len() - limit));
    kept
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Result of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedChangelog {
    pub path: PathBuf,
    pub commit_count: usize,
    pub merge_type: MergeType,
    /// Permanent documents moved into the archive directory.
    pub archived: Vec<String>,
}

/// Move every permanent document into [`ARCHIVE_DIR`], keeping file names.
pub fn archive_permanent(root: &Path) -> Result<Vec<String>, ChangelogError> {
    let names = permanent_documents(root)?;
    if names.is_empty() {
        return Ok(names);
    }
    let archive = root.join(ARCHIVE_DIR);
    std::fs::create_dir_all(&archive)?;
    for name in &names {
        std::fs::rename(root.join(name), archive.join(name))?;
        debug!(name = %name, "archived changelog");
    }
    info!(count = names.len(), "archived previous changelogs");
    Ok(names)
}

/// Generate the pending changelog for `target..HEAD`.
///
/// Nothing on disk changes when the range holds no commits.
#[instrument(skip(git, config))]
pub fn generate(
    git: &GitClient,
    config: &ChangelogConfig,
    branch: &str,
    target: &str,
) -> Result<GeneratedChangelog, CoreError> {
    let target_oid = git.resolve_branch(target, &config.remote)?;
    let commits = git.commits_since(target_oid)?;
    if commits.is_empty() {
        return Err(WorkflowError::NoCommitsInRange {
            target: target.to_string(),
            branch: branch.to_string(),
        }
        .into());
    }

    let head_oid = git.head_oid()?;
    let merge_type = if git.is_ancestor(target_oid, head_oid)? {
        MergeType::FastForward
    } else {
        MergeType::MergeCommit
    };

    let input = ChangelogInput {
        date: Utc::now().format("%Y-%m-%d").to_string(),
        branch: branch.to_string(),
        target: target.to_string(),
        merge_type,
        diff_stat: git.diff_stat(target_oid)?,
        web_base: git
            .remote_url(&config.remote)
            .and_then(|url| derive_web_base_url(&url)),
        commits,
        stat_line_limit: config.stat_line_limit,
    };
    let document = render(&input);

    let root = git.workdir();
    let archived = archive_permanent(root)?;
    let path = pending_path(root);
    std::fs::write(&path, document).map_err(ChangelogError::from)?;
    info!(path = %path.display(), commits = input.commits.len(), "generated changelog");

    Ok(GeneratedChangelog {
        path,
        commit_count: input.commits.len(),
        merge_type,
        archived,
    })
}

// ---------------------------------------------------------------------------
// Renaming
// ---------------------------------------------------------------------------

/// Rename the pending document to its permanent name and fill in the hash.
///
/// Fails with [`ChangelogError::Collision`] when the permanent document
/// already exists, unless `replace` is set.
pub fn rename_pending(
    root: &Path,
    short_hash: &str,
    replace: bool,
) -> Result<PathBuf, ChangelogError> {
    let pending = pending_path(root);
    let permanent = permanent_path(root, short_hash);
    if permanent.exists() && !replace {
        return Err(ChangelogError::Collision {
            pending: PENDING_CHANGELOG.to_string(),
            permanent: permanent_name(short_hash),
        });
    }

    std::fs::rename(&pending, &permanent)?;
    let text = std::fs::read_to_string(&permanent)?;
    std::fs::write(&permanent, text.replace(MERGE_HASH_PLACEHOLDER, short_hash))?;
    info!(path = %permanent.display(), "renamed pending changelog");
    Ok(permanent)
}

/// Delete the pending document; a missing file is not an error.
pub fn discard_pending(root: &Path) -> Result<(), ChangelogError> {
    match std::fs::remove_file(pending_path(root)) {
        Ok(()) => {
            info!("discarded pending changelog");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(sha: &str, subject: &str) -> CommitSummary {
        CommitSummary {
            sha: sha.to_string(),
            short_sha: sha[..7].to_string(),
            subject: subject.to_string(),
        }
    }

    fn sample_input() -> ChangelogInput {
        ChangelogInput {
            date: "2026-10-16".into(),
            branch: "feat-x".into(),
            target: "main".into(),
            merge_type: MergeType::FastForward,
            commits: vec![
                commit("1111111aaaaaaaa", "Add parser"),
                commit("2222222bbbbbbbb", "Fix typo"),
            ],
            diff_stat: " src/lib.rs | 3 ++-\n 1 file changed, 2 insertions(+), 1 deletion(-)\n"
                .into(),
            web_base: None,
            stat_line_limit: 100,
        }
    }

    #[test]
    fn test_render_header_and_placeholder() {
        let doc = render(&sample_input());
        assert!(doc.contains("- **Date:** 2026-10-16 (UTC)"));
        assert!(doc.contains("- **Source branch:** `feat-x`"));
        assert!(doc.contains("- **Target branch:** `main`"));
        assert!(doc.contains("- **Merge type:** Fast-forward"));
        assert!(doc.contains(MERGE_HASH_PLACEHOLDER));
        assert!(doc.contains("src/lib.rs | 3 ++-"));
    }

    #[test]
    fn test_render_commit_lines_keep_order() {
        let doc = render(&sample_input());
        let entries: Vec<&str> = doc
            .lines()
            .filter(|l| l.starts_with("- ") && !l.starts_with("- **"))
            .collect();
        assert_eq!(entries, vec!["- Add parser (`1111111`)", "- Fix typo (`2222222`)"]);
    }

    #[test]
    fn test_render_links_when_remote_is_known() {
        let mut input = sample_input();
        input.web_base = Some("https://github.com/acme/tool".into());
        let doc = render(&input);
        assert!(doc.contains(
            "- Add parser ([1111111](https://github.com/acme/tool/commit/1111111aaaaaaaa))"
        ));
    }

    #[test]
    fn test_stat_is_truncated() {
        let mut input = sample_input();
        input.diff_stat = (0..150).map(|i| format!(" file{} | 1 +\n", i)).collect();
        input.stat_line_limit = 100;
        let doc = render(&input);
        assert!(doc.contains("file99 |"));
        assert!(!doc.contains("file100 |"));
        assert!(doc.contains("... (50 more lines truncated)"));
    }

    #[test]
    fn test_merge_type_labels() {
        assert_eq!(MergeType::FastForward.to_string(), "Fast-forward");
        assert_eq!(MergeType::MergeCommit.to_string(), "Merge commit");
    }

    #[test]
    fn test_archive_moves_only_permanent_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("CHANGELOG-abc1234.md"), "old").unwrap();
        std::fs::write(root.join("CHANGELOG-def5678.md"), "older").unwrap();
        std::fs::write(root.join(PENDING_CHANGELOG), "pending").unwrap();
        std::fs::write(root.join("CHANGELOG.md"), "project changelog").unwrap();

        let moved = archive_permanent(root).unwrap();
        assert_eq!(moved, vec!["CHANGELOG-abc1234.md", "CHANGELOG-def5678.md"]);
        assert!(root.join(ARCHIVE_DIR).join("CHANGELOG-abc1234.md").exists());
        assert!(!root.join("CHANGELOG-abc1234.md").exists());
        assert!(root.join(PENDING_CHANGELOG).exists());
        assert!(root.join("CHANGELOG.md").exists());
    }

    #[test]
    fn test_archive_without_documents_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(archive_permanent(dir.path()).unwrap().is_empty());
        assert!(!dir.path().join(ARCHIVE_DIR).exists());
    }

    #[test]
    fn test_rename_pending_substitutes_hash() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(
            pending_path(root),
            format!("merge: `{}`\n", MERGE_HASH_PLACEHOLDER),
        )
        .unwrap();

        let path = rename_pending(root, "9abcdef", false).unwrap();
        assert_eq!(path, root.join("CHANGELOG-9abcdef.md"));
        assert!(!pending_path(root).exists());
        assert_eq!(std::fs::read_to_string(path).unwrap(), "merge: `9abcdef`\n");
    }

    #[test]
    fn test_rename_pending_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::write(pending_path(root), "new").unwrap();
        std::fs::write(permanent_path(root, "9abcdef"), "existing").unwrap();

        assert!(matches!(
            rename_pending(root, "9abcdef", false),
            Err(ChangelogError::Collision { .. })
        ));
        assert!(pending_path(root).exists());
        assert_eq!(std::fs::read_to_string(permanent_path(root, "9abcdef")).unwrap(), "existing");

        rename_pending(root, "9abcdef", true).unwrap();
        assert_eq!(std::fs::read_to_string(permanent_path(root, "9abcdef")).unwrap(), "new");
    }

    #[test]
    fn test_discard_pending_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(pending_path(dir.path()), "x").unwrap();
        discard_pending(dir.path()).unwrap();
        discard_pending(dir.path()).unwrap();
        assert!(!pending_path(dir.path()).exists());
    }
}
