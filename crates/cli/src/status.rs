//! `status` subcommand: what the workflow would find if run now.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde::Serialize;

use dev_conventions_core::changelog::{self, ARCHIVE_DIR};
use dev_conventions_core::config::ConventionsConfig;
use dev_conventions_core::conflict::{detect_conflicts, ConflictKind};
use dev_conventions_core::git::GitClient;
use dev_conventions_core::state::{StateFile, WorkflowState};

use crate::style;

#[derive(Debug, Serialize)]
struct ConflictRow {
    path: String,
    code: &'static str,
    kind: ConflictKind,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    repository: String,
    branch: Option<String>,
    head: Option<String>,
    remote: String,
    remote_configured: bool,
    merge_in_progress: bool,
    conflicts: Vec<ConflictRow>,
    workflow: Option<WorkflowState>,
    pending_changelog: bool,
    changelogs: Vec<String>,
    archived_changelogs: usize,
}

fn collect(git: &GitClient, config: &ConventionsConfig) -> Result<StatusReport> {
    let root = git.workdir();
    let merge_in_progress = git.merge_in_progress();
    let conflicts = if merge_in_progress {
        detect_conflicts(git)
            .context("failed to read conflicts")?
            .into_iter()
            .map(|c| ConflictRow {
                code: c.kind.code(),
                kind: c.kind,
                path: c.path,
            })
            .collect()
    } else {
        Vec::new()
    };
    let archived_changelogs = std::fs::read_dir(root.join(ARCHIVE_DIR))
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0);

    Ok(StatusReport {
        repository: root.display().to_string(),
        branch: git.current_branch().context("failed to read current branch")?,
        head: git.head_short().ok(),
        remote: config.changelog.remote.clone(),
        remote_configured: git.has_remote(&config.changelog.remote),
        merge_in_progress,
        conflicts,
        workflow: StateFile::in_repo(root)
            .load()
            .context("failed to read workflow state")?,
        pending_changelog: changelog::pending_path(root).exists(),
        changelogs: changelog::permanent_documents(root)
            .context("failed to list changelogs")?,
        archived_changelogs,
    })
}

/// Print the status report, as text or JSON.
pub fn run_status(repo: &Path, config: &ConventionsConfig, json: bool) -> Result<()> {
    let git = GitClient::open(repo).context("failed to open git repository")?;
    let report = collect(&git, config)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode status")?
        );
        return Ok(());
    }

    println!();
    println!("{}", style::header("dev-conventions status"));
    println!("{}", "═".repeat(22));
    println!();
    println!("  Repository : {}", report.repository);
    println!(
        "  Branch     : {}",
        report.branch.as_deref().unwrap_or("(detached HEAD)")
    );
    println!("  HEAD       : {}", report.head.as_deref().unwrap_or("—"));
    println!(
        "  Remote     : {}{}",
        report.remote,
        if report.remote_configured {
            String::new()
        } else {
            format!(" {}", style::dim("(not configured)"))
        }
    );

    println!();
    match &report.workflow {
        Some(state) => {
            println!("  Workflow   {}", style::status_in_progress());
            println!("    {} -> {}", state.branch, state.target);
            println!("    head       : {}", state.head);
            let stages: Vec<String> = state
                .stages
                .iter()
                .map(|s| style::stage(s.as_str()))
                .collect();
            println!(
                "    stages     : {}",
                if stages.is_empty() {
                    "—".to_string()
                } else {
                    stages.join(" → ")
                }
            );
            if let Some(merge_head) = &state.merge_head {
                println!("    merge head : {}", merge_head);
            }
        }
        None => println!("  Workflow   {}", style::status_idle()),
    }

    if report.merge_in_progress {
        println!();
        println!(
            "{}",
            style::warn(&format!(
                "A git merge is in progress with {} conflicted path(s)",
                report.conflicts.len()
            ))
        );
        if !report.conflicts.is_empty() {
            let mut table = Table::new();
            table.load_preset(UTF8_FULL);
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Code", "Kind", "Path"]);
            for c in &report.conflicts {
                table.add_row(vec![
                    Cell::new(c.code).fg(comfy_table::Color::Red),
                    Cell::new(c.kind.description()),
                    Cell::new(&c.path),
                ]);
            }
            println!("{}", table);
        }
    }

    println!();
    println!("  {}", style::header("Changelogs"));
    println!("  {}", "─".repeat(40));
    if report.pending_changelog {
        println!("  {} (pending)", changelog::PENDING_CHANGELOG);
    }
    for name in &report.changelogs {
        println!("  {}", name);
    }
    if !report.pending_changelog && report.changelogs.is_empty() {
        println!("  {}", style::dim("none"));
    }
    if report.archived_changelogs > 0 {
        println!(
            "  {}",
            style::dim(&format!(
                "{} archived in {}/",
                report.archived_changelogs, ARCHIVE_DIR
            ))
        );
    }
    println!();
    Ok(())
}
