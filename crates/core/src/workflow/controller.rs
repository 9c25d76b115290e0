//! Changelog/merge workflow state machine.
//!
//! A fresh run walks every phase in order:
//!
//! ```text
//! Init -> ChangelogCommitted -> Pushed -> TargetCheckedOut
//!      -> [MergeConflicted] -> Merged -> ChangelogRenamed -> Amended -> Done
//! ```
//!
//! `changelog_committed` and `merged` are appended to the state file as they
//! are reached, and the file is deleted at `Done`. A resumed run starts at
//! the phase matching the last recorded stage; every phase checks whether
//! its work is already done, so resuming never repeats a merge or a rename.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use super::preflight::{self, OrphanChoice, Preflight, StaleChoice};
use super::target;
use super::{WorkflowOptions, WorkflowOutcome};
use crate::changelog::{self, GeneratedChangelog, ARCHIVE_DIR, PENDING_CHANGELOG};
use crate::config::ConventionsConfig;
use crate::conflict::{self, ConflictedPath};
use crate::console::{say_lines, Console, Tone};
use crate::errors::{CoreError, GitError, StateError, WorkflowError};
use crate::git::GitClient;
use crate::state::{self, Stage, StateFile, WorkflowState};

/// Phrase the operator must type before a forced resolution.
pub const CONFIRMATION_PHRASE: &str = "force incoming";

/// Whether `answer` is the confirmation phrase, ignoring case and padding.
pub fn confirmation_matches(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(CONFIRMATION_PHRASE)
}

/// Backup tag name: `<target>-<YYYYMMDD-HHMMSS>` in UTC.
pub fn backup_tag_name(target: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", target, at.format("%Y%m%d-%H%M%S"))
}

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    ChangelogCommitted,
    Pushed,
    TargetCheckedOut,
    MergeConflicted,
    Merged,
    ChangelogRenamed,
    Amended,
    Done,
}

impl Phase {
    /// Phase a saved workflow resumes at.
    pub fn resume_from(stage: Option<Stage>) -> Self {
        match stage {
            Some(Stage::Merged) => Self::Merged,
            Some(Stage::ChangelogCommitted) | None => Self::ChangelogCommitted,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::ChangelogCommitted => "changelog_committed",
            Self::Pushed => "pushed",
            Self::TargetCheckedOut => "target_checked_out",
            Self::MergeConflicted => "merge_conflicted",
            Self::Merged => "merged",
            Self::ChangelogRenamed => "changelog_renamed",
            Self::Amended => "amended",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

enum Step {
    Next(Phase),
    Exit(WorkflowOutcome),
}

/// Choices when both the pending and the permanent changelog exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CollisionChoice {
    Replace,
    KeepExisting,
    Abort,
}

impl CollisionChoice {
    const ALL: [CollisionChoice; 3] = [Self::Replace, Self::KeepExisting, Self::Abort];
}

impl fmt::Display for CollisionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => write!(f, "Replace the existing changelog with the pending one"),
            Self::KeepExisting => {
                write!(f, "Keep the existing changelog and discard the pending one")
            }
            Self::Abort => write!(f, "Abort"),
        }
    }
}

/// Mutable context of one run.
struct Run {
    state: WorkflowState,
    archived: Vec<String>,
    conflicts: Vec<ConflictedPath>,
    backup_tag: Option<String>,
    changelog: Option<PathBuf>,
}

impl Run {
    fn new(state: WorkflowState) -> Self {
        Self {
            state,
            archived: Vec::new(),
            conflicts: Vec::new(),
            backup_tag: None,
            changelog: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct WorkflowController<'a> {
    git: &'a GitClient,
    config: &'a ConventionsConfig,
    console: &'a dyn Console,
    options: WorkflowOptions,
    state_file: StateFile,
}

impl<'a> WorkflowController<'a> {
    pub fn new(
        git: &'a GitClient,
        config: &'a ConventionsConfig,
        console: &'a dyn Console,
        options: WorkflowOptions,
    ) -> Self {
        Self {
            state_file: StateFile::in_repo(git.workdir()),
            git,
            config,
            console,
            options,
        }
    }

    fn root(&self) -> &Path {
        self.git.workdir()
    }

    fn remote(&self) -> &str {
        &self.config.changelog.remote
    }

    fn prefer_incoming(&self) -> bool {
        self.options.prefer_incoming || self.config.changelog.prefer_incoming
    }

    /// Run the workflow to completion or to the first stop.
    #[instrument(skip_all, fields(target = ?self.options.target))]
    pub async fn run(&self) -> Result<WorkflowOutcome, CoreError> {
        if self.options.rename_only {
            return self.rename_only();
        }

        match preflight::inspect(self.git, &self.state_file)? {
            Preflight::Clean => {}
            Preflight::Stale(saved) => match preflight::choose_stale(self.console, &saved)? {
                StaleChoice::Continue => return self.resume(saved).await,
                StaleChoice::Restart => {
                    self.state_file.remove()?;
                    changelog::discard_pending(self.root())?;
                    self.console
                        .say(Tone::Info, "Removed the saved workflow state and pending changelog.");
                }
                StaleChoice::Abort => return Ok(self.abort()),
            },
            Preflight::Orphaned => match preflight::choose_orphan(self.console, self.root())? {
                OrphanChoice::CompletePrevious => return self.complete_previous().await,
                OrphanChoice::Restart => {
                    changelog::discard_pending(self.root())?;
                    self.console.say(Tone::Info, "Removed the pending changelog.");
                }
                OrphanChoice::Abort => return Ok(self.abort()),
            },
        }

        self.start().await
    }

    fn abort(&self) -> WorkflowOutcome {
        self.console.say(Tone::Info, "Aborted; nothing was changed.");
        WorkflowOutcome::Aborted
    }

    /// Start a new cycle on the current branch.
    async fn start(&self) -> Result<WorkflowOutcome, CoreError> {
        let branch = self
            .git
            .current_branch()?
            .ok_or(WorkflowError::DetachedHead)?;
        let Some(target) = target::resolve_target(
            self.git,
            &self.config.changelog,
            self.console,
            self.options.target.as_deref(),
            &branch,
        )?
        else {
            return Ok(self.abort());
        };

        self.console.begin_task("Generating changelog");
        let generated = changelog::generate(self.git, &self.config.changelog, &branch, &target);
        self.console.end_task();
        let generated = generated?;
        self.report_generated(&generated);

        if self.options.generate_only {
            return Ok(WorkflowOutcome::Generated {
                changelog: generated.path,
                commits: generated.commit_count,
            });
        }

        if !self
            .console
            .confirm(&format!("Commit the changelog and merge {} into {}?", branch, target), true)?
        {
            self.console.say(Tone::Info, "Stopped before committing. To finish by hand:");
            say_lines(self.console, paused_steps(&branch, &target).iter().map(String::as_str));
            return Ok(WorkflowOutcome::Paused);
        }

        let mut run = Run::new(WorkflowState::new(branch, target, String::new()));
        run.archived = generated.archived;
        self.drive(&mut run, Phase::Init).await
    }

    fn report_generated(&self, generated: &GeneratedChangelog) {
        self.console.say(
            Tone::Success,
            &format!(
                "Generated {} with {} commit(s) ({}).",
                PENDING_CHANGELOG, generated.commit_count, generated.merge_type
            ),
        );
        for name in &generated.archived {
            self.console
                .say(Tone::Detail, &format!("archived {} into {}/", name, ARCHIVE_DIR));
        }
    }

    /// Continue a saved workflow.
    async fn resume(&self, saved: WorkflowState) -> Result<WorkflowOutcome, CoreError> {
        let head = self.git.head_short()?;
        if head != saved.head {
            warn!(recorded = %saved.head, current = %head, "HEAD moved since the state was saved");
            self.console.say(
                Tone::Warning,
                &format!(
                    "HEAD is now {} but the saved state recorded {}.",
                    head, saved.head
                ),
            );
        }
        if let Some(requested) = self.options.target.as_deref() {
            if requested != saved.target {
                self.console.say(
                    Tone::Warning,
                    &format!(
                        "Ignoring --target {}; the saved workflow merges into {}.",
                        requested, saved.target
                    ),
                );
            }
        }

        let phase = Phase::resume_from(saved.stage());
        info!(%phase, "resuming workflow");
        self.console.say(
            Tone::Info,
            &format!("Resuming {} -> {} at {}.", saved.branch, saved.target, phase),
        );
        let mut run = Run::new(saved);
        self.drive(&mut run, phase).await
    }

    async fn drive(&self, run: &mut Run, mut phase: Phase) -> Result<WorkflowOutcome, CoreError> {
        loop {
            debug!(%phase, "entering phase");
            let step = match phase {
                Phase::Init => self.commit_changelog(run).await?,
                Phase::ChangelogCommitted => self.push_branch(run).await?,
                Phase::Pushed => self.checkout_target(run).await?,
                Phase::TargetCheckedOut => self.merge(run).await?,
                Phase::MergeConflicted => self.resolve_conflicts(run).await?,
                Phase::Merged => self.rename_changelog(run)?,
                Phase::ChangelogRenamed => self.amend(run).await?,
                Phase::Amended => self.push_target(run).await?,
                Phase::Done => self.finish(run)?,
            };
            match step {
                Step::Next(next) => phase = next,
                Step::Exit(outcome) => return Ok(outcome),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Phases
    // -----------------------------------------------------------------------

    async fn commit_changelog(&self, run: &mut Run) -> Result<Step, CoreError> {
        let ignore_added = state::ensure_ignored(self.root()).map_err(StateError::from)?;

        let mut paths = vec![PathBuf::from(PENDING_CHANGELOG)];
        if ignore_added {
            paths.push(PathBuf::from(".gitignore"));
        }
        if !run.archived.is_empty() {
            paths.push(PathBuf::from(ARCHIVE_DIR));
            paths.extend(run.archived.iter().map(PathBuf::from));
        }
        let refs: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        self.git.stage_paths(&refs)?;
        self.git
            .commit(&format!(
                "chore(changelog): add changelog for {} -> {}",
                run.state.branch, run.state.target
            ))
            .await?;

        run.state.head = self.git.head_short()?;
        self.state_file.create(&run.state)?;
        self.state_file
            .append_stage(&mut run.state, Stage::ChangelogCommitted)?;
        self.console.say(
            Tone::Success,
            &format!("Committed the changelog on {} ({}).", run.state.branch, run.state.head),
        );
        Ok(Step::Next(Phase::ChangelogCommitted))
    }

    async fn push_branch(&self, run: &mut Run) -> Result<Step, CoreError> {
        self.push_if_wanted(&run.state.branch).await?;
        Ok(Step::Next(Phase::Pushed))
    }

    async fn checkout_target(&self, run: &mut Run) -> Result<Step, CoreError> {
        let target = &run.state.target;
        if self.git.current_branch()?.as_deref() == Some(target.as_str()) {
            debug!(%target, "already on target branch");
        } else {
            self.git.checkout(target).await?;
            self.console
                .say(Tone::Info, &format!("Checked out {}.", target));
        }
        Ok(Step::Next(Phase::TargetCheckedOut))
    }

    async fn merge(&self, run: &mut Run) -> Result<Step, CoreError> {
        let branch = run.state.branch.clone();
        let target = run.state.target.clone();

        let tip = self.git.resolve_branch(&branch, self.remote())?;
        if self.git.is_ancestor(tip, self.git.head_oid()?)? {
            self.console.say(
                Tone::Info,
                &format!("{} is already merged into {}; skipping the merge.", branch, target),
            );
            return self.record_merge(run);
        }

        let tag = self.create_backup_tag(&branch, &target)?;
        self.console.say(
            Tone::Info,
            &format!("Created backup tag {}. To undo the merge: git reset --hard {}", tag, tag),
        );
        run.backup_tag = Some(tag);

        let message = format!("Merge branch '{}' into {}", branch, target);
        self.console
            .begin_task(&format!("Merging {} into {}", branch, target));
        let out = self
            .git
            .merge_no_ff(&branch, &message, self.prefer_incoming())
            .await;
        self.console.end_task();
        let out = out?;

        if out.success {
            self.console
                .say(Tone::Success, &format!("Merged {} into {}.", branch, target));
            return self.record_merge(run);
        }

        let conflicts = conflict::detect_conflicts(self.git)?;
        if conflicts.is_empty() {
            return Err(GitError::CommandFailed {
                command: "merge".to_string(),
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            }
            .into());
        }
        run.conflicts = conflicts;
        Ok(Step::Next(Phase::MergeConflicted))
    }

    fn record_merge(&self, run: &mut Run) -> Result<Step, CoreError> {
        let merge_head = self.git.head_short()?;
        self.state_file.append_stage(&mut run.state, Stage::Merged)?;
        self.state_file
            .record_merge_head(&mut run.state, &merge_head)?;
        Ok(Step::Next(Phase::Merged))
    }

    fn create_backup_tag(&self, branch: &str, target: &str) -> Result<String, CoreError> {
        let base = backup_tag_name(target, Utc::now());
        let mut name = base.clone();
        let mut n = 1;
        while self.git.tag_target(&name).is_some() {
            n += 1;
            name = format!("{}-{}", base, n);
        }
        self.git.create_annotated_tag(
            &name,
            &format!("Backup of {} before merging {}", target, branch),
        )?;
        info!(tag = %name, "created backup tag");
        Ok(name)
    }

    async fn resolve_conflicts(&self, run: &mut Run) -> Result<Step, CoreError> {
        self.console.say(
            Tone::Warning,
            &format!("The merge stopped with {} conflicted path(s):", run.conflicts.len()),
        );
        for c in &run.conflicts {
            self.console
                .say(Tone::Detail, &format!("{}  {}", c.kind.code(), c.path));
        }

        if !self.console.is_interactive() {
            return Ok(self.leave_conflicted(run));
        }

        let options = [
            "Force-resolve, preferring incoming changes".to_string(),
            "Abort and resolve manually".to_string(),
        ];
        let choice = self
            .console
            .select("How should the conflicts be handled?", &options, 1)?;
        if choice != Some(0) {
            return Ok(self.leave_conflicted(run));
        }

        self.console.say(
            Tone::Warning,
            "Forcing discards our side of every conflicted path.",
        );
        let answer = self
            .console
            .input(&format!("Type '{}' to confirm", CONFIRMATION_PHRASE), None)?;
        if !confirmation_matches(&answer) {
            self.console
                .say(Tone::Error, "Confirmation did not match; the conflicts were left in place.");
            return Ok(self.leave_conflicted(run));
        }

        let resolved = conflict::force_resolve_incoming(self.git, &run.conflicts)?;
        for r in &resolved {
            self.console
                .say(Tone::Detail, &format!("{}: {}", r.path, r.resolution));
        }
        if !self.state_file.exists() {
            self.state_file.create(&run.state)?;
        }

        let remaining = conflict::detect_conflicts(self.git)?;
        if !remaining.is_empty() {
            run.conflicts = remaining;
            return Ok(self.leave_conflicted(run));
        }

        self.git.commit_merge().await?;
        self.console
            .say(Tone::Success, "Created the merge commit with incoming changes.");
        run.conflicts.clear();
        self.record_merge(run)
    }

    fn leave_conflicted(&self, run: &Run) -> Step {
        let files: Vec<String> = run.conflicts.iter().map(|c| c.path.clone()).collect();
        self.console.say(Tone::Info, "To finish the merge by hand:");
        say_lines(
            self.console,
            conflict_steps(&files, run.backup_tag.as_deref()).iter().map(String::as_str),
        );
        Step::Exit(WorkflowOutcome::Conflicted { files })
    }

    fn rename_changelog(&self, run: &mut Run) -> Result<Step, CoreError> {
        let short = match &run.state.merge_head {
            Some(hash) => hash.clone(),
            None => self.git.head_short()?,
        };
        match self.place_changelog(&short)? {
            Some(path) => {
                run.changelog = Some(path);
                Ok(Step::Next(Phase::ChangelogRenamed))
            }
            None => {
                self.console.say(
                    Tone::Info,
                    "Stopped before renaming; the saved state was kept. Re-run to continue.",
                );
                Ok(Step::Exit(WorkflowOutcome::Aborted))
            }
        }
    }

    /// Move the pending changelog to its permanent name.
    ///
    /// `Ok(None)` means the operator aborted at the collision menu.
    fn place_changelog(&self, short: &str) -> Result<Option<PathBuf>, CoreError> {
        let root = self.root();
        let pending = changelog::pending_path(root);
        let permanent = changelog::permanent_path(root, short);

        let path = match (pending.exists(), permanent.exists()) {
            (false, true) => {
                self.console.say(
                    Tone::Info,
                    &format!("Changelog already renamed to {}.", changelog::permanent_name(short)),
                );
                permanent
            }
            (false, false) => {
                return Err(WorkflowError::NoPendingChangelog(pending.display().to_string()).into())
            }
            (true, false) => changelog::rename_pending(root, short, false)?,
            (true, true) => match self.choose_collision(short)? {
                CollisionChoice::Replace => changelog::rename_pending(root, short, true)?,
                CollisionChoice::KeepExisting => {
                    changelog::discard_pending(root)?;
                    permanent
                }
                CollisionChoice::Abort => return Ok(None),
            },
        };
        self.console.say(
            Tone::Success,
            &format!("Changelog saved as {}.", display_name(&path)),
        );
        Ok(Some(path))
    }

    fn choose_collision(&self, short: &str) -> Result<CollisionChoice, CoreError> {
        self.console.say(
            Tone::Warning,
            &format!(
                "Both {} and {} exist.",
                PENDING_CHANGELOG,
                changelog::permanent_name(short)
            ),
        );
        let abort = CollisionChoice::ALL.len() - 1;
        if !self.console.is_interactive() {
            return Ok(CollisionChoice::Abort);
        }
        let labels: Vec<String> = CollisionChoice::ALL.iter().map(ToString::to_string).collect();
        let picked = self
            .console
            .select("Which changelog should be kept?", &labels, abort)?;
        Ok(picked
            .and_then(|i| CollisionChoice::ALL.get(i).copied())
            .unwrap_or(CollisionChoice::Abort))
    }

    /// Stage the permanent changelog, the removal of the pending one and the
    /// archive directory.
    fn stage_changelog(&self, name: &Path) -> Result<(), CoreError> {
        let mut paths = vec![name, Path::new(PENDING_CHANGELOG)];
        if self.root().join(ARCHIVE_DIR).is_dir() {
            paths.push(Path::new(ARCHIVE_DIR));
        }
        self.git.stage_paths(&paths)?;
        Ok(())
    }

    async fn amend(&self, run: &mut Run) -> Result<Step, CoreError> {
        let path = run.changelog.clone().ok_or_else(|| {
            let pending = changelog::pending_path(self.root());
            WorkflowError::NoPendingChangelog(pending.display().to_string())
        })?;
        let name = PathBuf::from(display_name(&path));

        let pending_in_head = self.git.tracked_in_head(Path::new(PENDING_CHANGELOG))?;
        if self.git.tracked_in_head(&name)? && !pending_in_head {
            self.console.say(
                Tone::Info,
                &format!("The merge commit already carries {}.", name.display()),
            );
            return Ok(Step::Next(Phase::Amended));
        }

        self.stage_changelog(&name)?;
        self.git.amend().await?;
        self.console
            .say(Tone::Success, "Amended the merge commit with the changelog.");
        Ok(Step::Next(Phase::Amended))
    }

    async fn push_target(&self, run: &mut Run) -> Result<Step, CoreError> {
        let dirty = self.git.dirty_paths()?;
        if !dirty.is_empty() {
            warn!(count = dirty.len(), "working tree not clean after amend");
            self.console
                .say(Tone::Warning, "The working tree is not clean after amending:");
            say_lines(self.console, dirty.iter().map(String::as_str));
        }
        self.push_if_wanted(&run.state.target).await?;
        Ok(Step::Next(Phase::Done))
    }

    fn finish(&self, run: &mut Run) -> Result<Step, CoreError> {
        self.state_file.remove()?;
        let merge_head = match &run.state.merge_head {
            Some(hash) => hash.clone(),
            None => self.git.head_short()?,
        };
        let changelog = run
            .changelog
            .clone()
            .unwrap_or_else(|| changelog::permanent_path(self.root(), &merge_head));
        self.console.say(
            Tone::Success,
            &format!(
                "Merged {} into {} with {}.",
                run.state.branch,
                run.state.target,
                display_name(&changelog)
            ),
        );
        if let Some(tag) = &run.backup_tag {
            self.console
                .say(Tone::Detail, &format!("backup tag: {}", tag));
        }
        Ok(Step::Exit(WorkflowOutcome::Completed {
            changelog,
            merge_head,
        }))
    }

    async fn push_if_wanted(&self, branch: &str) -> Result<(), CoreError> {
        let remote = self.remote();
        if !self.git.has_remote(remote) {
            warn!(remote, branch, "remote not configured; skipping push");
            self.console.say(
                Tone::Warning,
                &format!("Remote '{}' is not configured; skipping push of {}.", remote, branch),
            );
            return Ok(());
        }
        if !self
            .console
            .confirm(&format!("Push {} to {}?", branch, remote), true)?
        {
            self.console
                .say(Tone::Info, &format!("Skipped pushing {}.", branch));
            return Ok(());
        }

        self.console
            .begin_task(&format!("Pushing {} to {}", branch, remote));
        let pushed = self.git.push(remote, branch).await;
        self.console.end_task();
        pushed?;
        self.console
            .say(Tone::Success, &format!("Pushed {} to {}.", branch, remote));
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Other entry points
    // -----------------------------------------------------------------------

    /// Rename and commit a leftover pending changelog, ending the workflow.
    async fn complete_previous(&self) -> Result<WorkflowOutcome, CoreError> {
        let short = self.git.head_short()?;
        let Some(path) = self.place_changelog(&short)? else {
            return Ok(self.abort());
        };
        let name = PathBuf::from(display_name(&path));
        self.stage_changelog(&name)?;

        if self.git.head_is_merge()? {
            self.git.amend().await?;
            self.console
                .say(Tone::Success, "Amended the merge commit with the changelog.");
        } else {
            self.git
                .commit(&format!("chore(changelog): add {}", name.display()))
                .await?;
            self.console
                .say(Tone::Success, "Committed the changelog.");
        }
        Ok(WorkflowOutcome::Completed {
            changelog: path,
            merge_head: short,
        })
    }

    /// Rename the pending changelog with the current HEAD hash. Nothing is
    /// committed.
    fn rename_only(&self) -> Result<WorkflowOutcome, CoreError> {
        if self.state_file.exists() {
            return Err(
                WorkflowError::ActiveWorkflow(self.state_file.path().display().to_string()).into(),
            );
        }
        let pending = changelog::pending_path(self.root());
        if !pending.exists() {
            return Err(WorkflowError::NoPendingChangelog(pending.display().to_string()).into());
        }

        let short = self.git.head_short()?;
        let path = changelog::rename_pending(self.root(), &short, false)?;
        let name = display_name(&path);
        self.console.say(
            Tone::Success,
            &format!("Renamed {} to {}.", PENDING_CHANGELOG, name),
        );
        self.console.say(Tone::Info, "Next steps:");
        say_lines(
            self.console,
            [
                format!("git add {}", name),
                format!("git rm --cached --ignore-unmatch {}", PENDING_CHANGELOG),
                "git commit --amend --no-edit".to_string(),
            ]
            .iter()
            .map(String::as_str),
        );
        Ok(WorkflowOutcome::Renamed { changelog: path })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Manual steps after declining to commit the changelog.
fn paused_steps(branch: &str, target: &str) -> Vec<String> {
    vec![
        format!("git add {}", PENDING_CHANGELOG),
        format!(
            "git commit -m \"chore(changelog): add changelog for {} -> {}\"",
            branch, target
        ),
        format!("git checkout {}", target),
        format!("git merge --no-ff {}", branch),
        "dev-conventions changelog --rename-only".to_string(),
        "git add CHANGELOG-*.md && git commit --amend --no-edit".to_string(),
    ]
}

/// Manual steps for a merge left in conflict.
fn conflict_steps(files: &[String], backup_tag: Option<&str>) -> Vec<String> {
    let mut steps = vec![
        format!("resolve the conflicts, then: git add {}", files.join(" ")),
        "git commit --no-edit".to_string(),
        "dev-conventions changelog (choose \"Continue from the saved state\")".to_string(),
        "to abandon the merge instead: git merge --abort".to_string(),
    ];
    if let Some(tag) = backup_tag {
        steps.push(format!("to restore the target completely: git reset --hard {}", tag));
    }
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_confirmation_phrase_matching() {
        assert!(confirmation_matches("force incoming"));
        assert!(confirmation_matches("  FORCE Incoming \n"));
        assert!(!confirmation_matches("force"));
        assert!(!confirmation_matches("yes"));
    }

    #[test]
    fn test_backup_tag_name_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(backup_tag_name("main", at), "main-20240309-070501");
    }

    #[test]
    fn test_resume_phase_follows_last_stage() {
        assert_eq!(Phase::resume_from(None), Phase::ChangelogCommitted);
        assert_eq!(
            Phase::resume_from(Some(Stage::ChangelogCommitted)),
            Phase::ChangelogCommitted
        );
        assert_eq!(Phase::resume_from(Some(Stage::Merged)), Phase::Merged);
    }

    #[test]
    fn test_conflict_steps_mention_backup_tag() {
        let steps = conflict_steps(&["a.txt".into(), "b.txt".into()], Some("main-20240101-000000"));
        assert_eq!(steps[0], "resolve the conflicts, then: git add a.txt b.txt");
        assert!(steps
            .last()
            .map(|s| s.ends_with("git reset --hard main-20240101-000000"))
            .unwrap_or(false));
        assert_eq!(conflict_steps(&[], None).len(), 4);
    }

    #[test]
    fn test_collision_abort_is_last() {
        assert_eq!(CollisionChoice::ALL[2], CollisionChoice::Abort);
    }
}
