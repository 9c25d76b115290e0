//! Local Git repository operations.
//!
//! Read-side queries (branches, commit ranges, ancestry, diff stats, index
//! state) go through `git2`. Porcelain operations that must honour the
//! user's git configuration (identity, hooks, credential helpers) run the
//! `git` binary in the working tree.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use git2::{
    BranchType, DiffStatsFormat, IndexAddOption, Oid, Repository, RepositoryState, Sort,
    StatusOptions,
};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::errors::GitError;

/// High-level Git client wrapping a `git2::Repository` and its working tree.
pub struct GitClient {
    repo: Repository,
    workdir: PathBuf,
}

/// One commit of a changelog range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub short_sha: String,
    pub subject: String,
}

/// Captured result of a `git` invocation.
#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl GitClient {
    /// Open the repository containing `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GitError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening git repository");
        let repo = Repository::discover(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| GitError::BareRepository(path.display().to_string()))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Name of the checked-out branch, or `None` when HEAD is detached.
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        if self.repo.head_detached()? {
            return Ok(None);
        }
        let head = match self.repo.head() {
            Ok(head) => head,
            // Unborn branch: HEAD names a branch with no commits yet.
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let head_ref = self.repo.find_reference("HEAD")?;
                return Ok(head_ref
                    .symbolic_target()
                    .and_then(|t| t.strip_prefix("refs/heads/"))
                    .map(str::to_string));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(head.shorthand().map(str::to_string))
    }

    /// Commit HEAD points at.
    pub fn head_oid(&self) -> Result<Oid, GitError> {
        Ok(self.repo.head()?.peel_to_commit()?.id())
    }

    /// Abbreviated SHA of HEAD, as `git rev-parse --short HEAD` prints it.
    pub fn head_short(&self) -> Result<String, GitError> {
        self.short_id(self.head_oid()?)
    }

    /// Abbreviate `oid` to the shortest unambiguous form.
    pub fn short_id(&self, oid: Oid) -> Result<String, GitError> {
        let object = self.repo.find_object(oid, None)?;
        let buf = object.short_id()?;
        Ok(buf.as_str().unwrap_or_default().to_string())
    }

    /// Whether a repository-level merge is in progress (`MERGE_HEAD` exists).
    pub fn merge_in_progress(&self) -> bool {
        matches!(self.repo.state(), RepositoryState::Merge)
    }

    /// Whether HEAD is a merge commit.
    pub fn head_is_merge(&self) -> Result<bool, GitError> {
        Ok(self.repo.head()?.peel_to_commit()?.parent_count() > 1)
    }

    /// Resolve a branch name to a commit: local branch first, then the
    /// remote-tracking branch under `remote`, then any revision expression.
    pub fn resolve_branch(&self, name: &str, remote: &str) -> Result<Oid, GitError> {
        if let Ok(branch) = self.repo.find_branch(name, BranchType::Local) {
            return Ok(branch.get().peel_to_commit()?.id());
        }
        let tracking = format!("{}/{}", remote, name);
        if let Ok(branch) = self.repo.find_branch(&tracking, BranchType::Remote) {
            return Ok(branch.get().peel_to_commit()?.id());
        }
        self.repo
            .revparse_single(name)
            .and_then(|obj| obj.peel_to_commit())
            .map(|c| c.id())
            .map_err(|_| GitError::RefNotFound(name.to_string()))
    }

    /// Whether `ancestor` is reachable from `descendant` (or equal to it).
    pub fn is_ancestor(&self, ancestor: Oid, descendant: Oid) -> Result<bool, GitError> {
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }

    /// Non-merge commits in `target..HEAD`, newest first.
    #[instrument(skip(self))]
    pub fn commits_since(&self, target: Oid) -> Result<Vec<CommitSummary>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.push_head()?;
        revwalk.hide(target)?;
        revwalk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;

        let mut commits = Vec::new();
        for oid_result in revwalk {
            let oid = oid_result?;
            let commit = self.repo.find_commit(oid)?;
            if commit.parent_count() > 1 {
                continue;
            }
            commits.push(CommitSummary {
                sha: oid.to_string(),
                short_sha: self.short_id(oid)?,
                subject: commit.summary().unwrap_or("").to_string(),
            });
        }
        debug!(count = commits.len(), "collected commits");
        Ok(commits)
    }

    /// `diff --stat` between the merge base of `target` and HEAD.
    pub fn diff_stat(&self, target: Oid) -> Result<String, GitError> {
        let head = self.repo.head()?.peel_to_commit()?;
        let base = self.repo.merge_base(target, head.id()).unwrap_or(target);
        let old_tree = self.repo.find_commit(base)?.tree()?;
        let new_tree = head.tree()?;
        let diff = self
            .repo
            .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)?;
        let stats = diff.stats()?;
        let buf = stats.to_buf(DiffStatsFormat::FULL, 80)?;
        Ok(buf.as_str().unwrap_or_default().to_string())
    }

    /// Whether a remote with this name is configured.
    pub fn has_remote(&self, remote: &str) -> bool {
        self.repo.find_remote(remote).is_ok()
    }

    /// Fetch URL of a remote, if configured.
    pub fn remote_url(&self, remote: &str) -> Option<String> {
        self.repo
            .find_remote(remote)
            .ok()
            .and_then(|r| r.url().map(str::to_string))
    }

    /// Branch names under `refs/remotes/<remote>/`, without the prefix.
    pub fn remote_branches(&self, remote: &str) -> Result<Vec<String>, GitError> {
        let prefix = format!("{}/", remote);
        let mut names = Vec::new();
        for branch_result in self.repo.branches(Some(BranchType::Remote))? {
            let (branch, _) = branch_result?;
            if let Some(name) = branch.name()? {
                if let Some(short) = name.strip_prefix(&prefix) {
                    if short != "HEAD" {
                        names.push(short.to_string());
                    }
                }
            }
        }
        Ok(names)
    }

    /// List all local branch names.
    pub fn local_branches(&self) -> Result<Vec<String>, GitError> {
        let mut names = Vec::new();
        for branch_result in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch_result?;
            if let Some(name) = branch.name()? {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    /// Create an annotated tag at HEAD.
    #[instrument(skip(self, message))]
    pub fn create_annotated_tag(&self, name: &str, message: &str) -> Result<Oid, GitError> {
        let target = self.repo.head()?.peel_to_commit()?;
        let tagger = self.repo.signature()?;
        let oid = self
            .repo
            .tag(name, target.as_object(), &tagger, message, false)?;
        info!(name, target = %target.id(), "created tag");
        Ok(oid)
    }

    /// Commit a tag points at, if it exists.
    pub fn tag_target(&self, name: &str) -> Option<Oid> {
        self.repo
            .find_reference(&format!("refs/tags/{}", name))
            .ok()
            .and_then(|r| r.peel_to_commit().ok())
            .map(|c| c.id())
    }

    /// Whether `rel` exists in the tree of the HEAD commit.
    pub fn tracked_in_head(&self, rel: &Path) -> Result<bool, GitError> {
        let tree = self.repo.head()?.peel_to_tree()?;
        Ok(tree.get_path(rel).is_ok())
    }

    /// Paths with uncommitted changes (untracked included, ignored excluded).
    pub fn dirty_paths(&self) -> Result<Vec<String>, GitError> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .include_ignored(false)
            .recurse_untracked_dirs(true);
        let statuses = self.repo.statuses(Some(&mut opts))?;
        Ok(statuses
            .iter()
            .filter_map(|entry| entry.path().map(str::to_string))
            .collect())
    }

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    /// Stage the current state of each path, relative to the working tree.
    ///
    /// Directories are added recursively, existing files are added, and
    /// paths that no longer exist on disk are removed from the index.
    pub fn stage_paths(&self, paths: &[&Path]) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        for rel in paths {
            let abs = self.workdir.join(rel);
            if abs.is_dir() {
                index.add_all(std::iter::once(*rel), IndexAddOption::DEFAULT, None)?;
            } else if abs.exists() {
                index.add_path(rel)?;
            } else if index.get_path(rel, 0).is_some() {
                index.remove_path(rel)?;
            }
        }
        index.write()?;
        debug!(count = paths.len(), "staged paths");
        Ok(())
    }

    /// Drop every index entry (all stages) for `rel`.
    pub fn remove_from_index(&self, rel: &Path) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        index.remove_path(rel)?;
        index.write()?;
        Ok(())
    }

    /// Write a blob to the working tree at `rel` and stage it at stage 0.
    pub fn checkout_blob(&self, rel: &Path, blob: Oid, mode: u32) -> Result<(), GitError> {
        let content = self.repo.find_blob(blob)?.content().to_vec();
        let abs = self.workdir.join(rel);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&abs, content)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perm = if mode & 0o111 != 0 { 0o755 } else { 0o644 };
            std::fs::set_permissions(&abs, std::fs::Permissions::from_mode(perm))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        let mut index = self.repo.index()?;
        index.read(false)?;
        index.add_path(rel)?;
        index.write()?;
        Ok(())
    }

    /// Make the working tree match the index and delete untracked files.
    pub fn reset_worktree_to_index(&self) -> Result<(), GitError> {
        let mut index = self.repo.index()?;
        index.read(false)?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        self.repo.checkout_index(Some(&mut index), Some(&mut checkout))?;
        info!("working tree reset to index");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Porcelain (git binary)
    // -----------------------------------------------------------------------

    /// Run `git` in the working tree and capture its output.
    pub async fn run_git(&self, args: &[&str]) -> Result<GitOutput, GitError> {
        debug!(?args, "running git");
        let output = Command::new("git")
            .current_dir(&self.workdir)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => GitError::BinaryNotFound(e.to_string()),
                _ => GitError::IoError(e),
            })?;
        Ok(GitOutput {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    /// Run `git` and fail on a non-zero exit status.
    async fn git(&self, args: &[&str]) -> Result<String, GitError> {
        let out = self.run_git(args).await?;
        if !out.success {
            let command = args.first().copied().unwrap_or("").to_string();
            warn!(%command, stderr = %out.stderr.trim(), "git command failed");
            return Err(GitError::CommandFailed {
                command,
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            });
        }
        Ok(out.stdout)
    }

    /// Switch the working tree to `branch`.
    #[instrument(skip(self))]
    pub async fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.git(&["checkout", branch]).await?;
        info!(branch, "checked out");
        Ok(())
    }

    /// Commit the index with `message`.
    #[instrument(skip(self, message))]
    pub async fn commit(&self, message: &str) -> Result<(), GitError> {
        self.git(&["commit", "-m", message]).await?;
        info!("created commit");
        Ok(())
    }

    /// Conclude an in-progress merge using the prepared merge message.
    pub async fn commit_merge(&self) -> Result<(), GitError> {
        self.git(&["commit", "--no-edit"]).await?;
        info!("created merge commit");
        Ok(())
    }

    /// Fold the index into HEAD, keeping its message.
    pub async fn amend(&self) -> Result<(), GitError> {
        self.git(&["commit", "--amend", "--no-edit"]).await?;
        info!("amended HEAD");
        Ok(())
    }

    /// Attempt a `--no-ff` merge of `branch` into the current branch.
    ///
    /// A failed merge is returned as output, not as an error: the caller
    /// inspects the index to tell conflicts from other failures.
    #[instrument(skip(self, message))]
    pub async fn merge_no_ff(
        &self,
        branch: &str,
        message: &str,
        prefer_incoming: bool,
    ) -> Result<GitOutput, GitError> {
        let mut args = vec!["merge", "--no-ff", "-m", message];
        if prefer_incoming {
            args.extend(["--strategy-option", "theirs"]);
        }
        args.push(branch);
        let out = self.run_git(&args).await?;
        if out.success {
            info!(branch, "merge succeeded");
        } else {
            warn!(branch, exit_code = out.exit_code, "merge did not complete");
        }
        Ok(out)
    }

    /// Push `branch` to `remote`, setting upstream.
    #[instrument(skip(self))]
    pub async fn push(&self, remote: &str, branch: &str) -> Result<(), GitError> {
        info!(remote, branch, "pushing");
        self.git(&["push", "-u", remote, branch]).await?;
        info!("push completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn git(dir: &Path, args: &[&str]) {
        let status = StdCommand::new("git")
            .current_dir(dir)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .expect("git should run");
        assert!(status.success(), "git {:?} failed", args);
    }

    fn init_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        git(dir.path(), &["init", "-q"]);
        git(dir.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
        git(dir.path(), &["config", "user.name", "Test"]);
        git(dir.path(), &["config", "user.email", "test@test.com"]);
        std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
        git(dir.path(), &["add", "."]);
        git(dir.path(), &["commit", "-q", "-m", "initial commit"]);
        dir
    }

    fn commit_file(dir: &Path, name: &str, content: &str, message: &str) {
        std::fs::write(dir.join(name), content).unwrap();
        git(dir, &["add", name]);
        git(dir, &["commit", "-q", "-m", message]);
    }

    #[test]
    fn test_repo_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GitClient::open(dir.path()),
            Err(GitError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_current_branch_and_detached() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        assert_eq!(client.current_branch().unwrap().as_deref(), Some("main"));

        let sha = client.head_oid().unwrap().to_string();
        git(dir.path(), &["checkout", "-q", "--detach", &sha]);
        assert_eq!(client.current_branch().unwrap(), None);
    }

    #[test]
    fn test_commits_since_excludes_merges_and_orders_newest_first() {
        let dir = init_repo();
        git(dir.path(), &["checkout", "-q", "-b", "feat"]);
        commit_file(dir.path(), "a.txt", "a", "add a");
        git(dir.path(), &["checkout", "-q", "-b", "side"]);
        commit_file(dir.path(), "b.txt", "b", "add b");
        git(dir.path(), &["checkout", "-q", "feat"]);
        commit_file(dir.path(), "c.txt", "c", "add c");
        git(dir.path(), &["merge", "-q", "--no-ff", "-m", "merge side", "side"]);
        commit_file(dir.path(), "d.txt", "d", "add d");

        let client = GitClient::open(dir.path()).unwrap();
        let main = client.resolve_branch("main", "origin").unwrap();
        let commits = client.commits_since(main).unwrap();
        let subjects: Vec<&str> = commits.iter().map(|c| c.subject.as_str()).collect();

        assert_eq!(commits.len(), 4);
        assert_eq!(subjects[0], "add d");
        assert!(!subjects.contains(&"merge side"));
        assert_eq!(*subjects.last().unwrap(), "add a");
        assert!(commits.iter().all(|c| c.sha.starts_with(&c.short_sha)));
    }

    #[test]
    fn test_is_ancestor() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        let base = client.resolve_branch("main", "origin").unwrap();
        git(dir.path(), &["checkout", "-q", "-b", "feat"]);
        commit_file(dir.path(), "a.txt", "a", "add a");
        let tip = client.resolve_branch("feat", "origin").unwrap();

        assert!(client.is_ancestor(base, tip).unwrap());
        assert!(!client.is_ancestor(tip, base).unwrap());
        assert!(client.is_ancestor(tip, tip).unwrap());
    }

    #[test]
    fn test_diff_stat_lists_changed_files() {
        let dir = init_repo();
        git(dir.path(), &["checkout", "-q", "-b", "feat"]);
        commit_file(dir.path(), "notes.txt", "one\ntwo\n", "add notes");
        let client = GitClient::open(dir.path()).unwrap();
        let main = client.resolve_branch("main", "origin").unwrap();
        let stat = client.diff_stat(main).unwrap();
        assert!(stat.contains("notes.txt"));
        assert!(stat.contains("1 file changed"));
    }

    #[test]
    fn test_resolve_branch_unknown() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        assert!(matches!(
            client.resolve_branch("nope", "origin"),
            Err(GitError::RefNotFound(_))
        ));
    }

    #[test]
    fn test_annotated_tag_points_at_head() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        client.create_annotated_tag("main-backup", "backup").unwrap();
        let head = client.resolve_branch("main", "origin").unwrap();
        assert_eq!(client.tag_target("main-backup"), Some(head));
        assert_eq!(client.tag_target("missing"), None);
    }

    #[test]
    fn test_stage_paths_adds_and_removes() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();
        std::fs::write(dir.path().join("archive/old.md"), "old").unwrap();
        std::fs::remove_file(dir.path().join("README.md")).unwrap();

        client
            .stage_paths(&[Path::new("archive"), Path::new("README.md")])
            .unwrap();

        let index = client.repo().index().unwrap();
        assert!(index.get_path(Path::new("archive/old.md"), 0).is_some());
        assert!(index.get_path(Path::new("README.md"), 0).is_none());
    }

    #[test]
    fn test_dirty_paths() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        assert!(client.dirty_paths().unwrap().is_empty());
        std::fs::write(dir.path().join("scratch.txt"), "x").unwrap();
        assert_eq!(client.dirty_paths().unwrap(), vec!["scratch.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_no_ff_creates_merge_commit() {
        let dir = init_repo();
        git(dir.path(), &["checkout", "-q", "-b", "feat"]);
        commit_file(dir.path(), "a.txt", "a", "add a");
        let client = GitClient::open(dir.path()).unwrap();

        client.checkout("main").await.unwrap();
        let out = client
            .merge_no_ff("feat", "Merge branch 'feat' into main", false)
            .await
            .unwrap();
        assert!(out.success, "{}", out.stderr);
        assert!(client.head_is_merge().unwrap());
        assert_eq!(client.current_branch().unwrap().as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_failed_command_reports_stderr() {
        let dir = init_repo();
        let client = GitClient::open(dir.path()).unwrap();
        let err = client.checkout("does-not-exist").await.unwrap_err();
        assert!(matches!(
            err,
            GitError::CommandFailed { ref command, .. } if command == "checkout"
        ));
    }
}
