//! dev-conventions command-line tool.
//!
//! Provides the `changelog` workflow (generate a changelog, merge the
//! current branch into a target, rename and amend), a `status` report of
//! in-flight work, and generation / validation of the configuration file.

mod status;
mod style;
mod terminal;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dev_conventions_core::config::{ConventionsConfig, CONFIG_FILE_NAME};
use dev_conventions_core::console::Console;
use dev_conventions_core::git::GitClient;
use dev_conventions_core::workflow::{WorkflowController, WorkflowOptions};

use terminal::{AutoConsole, TerminalConsole};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// dev-conventions command-line tool.
#[derive(Parser, Debug)]
#[command(
    name = "dev-conventions",
    version,
    about = "Changelog generation and guided merges for development conventions"
)]
struct Cli {
    /// Path to the TOML configuration file [default: <repo>/.dev-conventions.toml].
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter (overrides RUST_LOG and the configuration file).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Run as if started in this directory.
    #[arg(short = 'C', long = "repo", global = true, default_value = ".")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a changelog and merge the current branch into a target.
    Changelog {
        /// Target branch; prompts with conventional branches when omitted.
        #[arg(short, long)]
        target: Option<String>,

        /// Only rename an existing pending changelog with the HEAD hash.
        #[arg(long, conflicts_with = "generate_only")]
        rename_only: bool,

        /// Only write the pending changelog; commit and merge nothing.
        #[arg(long)]
        generate_only: bool,

        /// Resolve content conflicts in favour of the incoming branch.
        #[arg(long)]
        prefer_incoming: bool,

        /// Skip all confirmations, taking every default.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show in-flight workflow state, conflicts and changelogs.
    Status {
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a commented default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,
    },
    /// Validate the configuration file.
    Validate,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}", style::error(&format!("Error: {:#}", e)));
            ExitCode::FAILURE
        }
    }
}

/// Level from `--log-level`, else `RUST_LOG`, else the config file.
fn init_tracing(cli_level: Option<&str>, config_level: &str) {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config_level)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let Cli {
        config: config_path,
        log_level,
        repo,
        command,
    } = cli;

    if let Commands::Config {
        action: ConfigAction::Init { output },
    } = &command
    {
        init_tracing(log_level.as_deref(), "warn");
        cmd_config_init(output)?;
        return Ok(0);
    }

    let root = repo_root(&repo);
    let config = ConventionsConfig::discover(&root, config_path.as_deref())
        .context("failed to load configuration")?;
    init_tracing(log_level.as_deref(), &config.general.log_level);
    debug!(root = %root.display(), "configuration loaded");

    match command {
        Commands::Changelog {
            target,
            rename_only,
            generate_only,
            prefer_incoming,
            yes,
        } => {
            let options = WorkflowOptions {
                target,
                rename_only,
                generate_only,
                prefer_incoming,
            };
            cmd_changelog(&repo, &config, options, yes).await
        }
        Commands::Status { json } => {
            status::run_status(&repo, &config, json)?;
            Ok(0)
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Validate => {
                    cmd_config_validate(&root, config_path.as_deref(), &config)
                }
                ConfigAction::Init { output } => cmd_config_init(&output)?,
            }
            Ok(0)
        }
    }
}

/// Working tree root containing `path`, or `path` itself outside a repository.
fn repo_root(path: &Path) -> PathBuf {
    GitClient::open(path)
        .map(|git| git.workdir().to_path_buf())
        .unwrap_or_else(|_| path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Subcommand implementations
// ---------------------------------------------------------------------------

async fn cmd_changelog(
    repo: &Path,
    config: &ConventionsConfig,
    options: WorkflowOptions,
    yes: bool,
) -> Result<u8> {
    let git = GitClient::open(repo).context("failed to open git repository")?;

    let console: Box<dyn Console> = if yes || !std::io::stdin().is_terminal() {
        Box::new(AutoConsole)
    } else {
        Box::new(TerminalConsole::new())
    };

    let outcome = WorkflowController::new(&git, config, console.as_ref(), options)
        .run()
        .await
        .context("changelog workflow failed")?;
    info!(?outcome, "workflow finished");
    Ok(outcome.exit_code())
}

fn cmd_config_init(output: &Path) -> Result<()> {
    if output.exists() {
        anyhow::bail!(
            "file already exists: {}. Use a different path or remove the existing file.",
            output.display()
        );
    }

    std::fs::write(output, ConventionsConfig::default_template())
        .context("failed to write config file")?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Adjust the remote and target branch candidates if needed");
    println!(
        "  2. Validate with: dev-conventions config validate --config {}",
        output.display()
    );
    Ok(())
}

fn cmd_config_validate(root: &Path, explicit: Option<&Path>, config: &ConventionsConfig) {
    let source = match explicit {
        Some(path) => path.display().to_string(),
        None if root.join(CONFIG_FILE_NAME).exists() => {
            root.join(CONFIG_FILE_NAME).display().to_string()
        }
        None => "built-in defaults".to_string(),
    };
    println!("Validating configuration: {}", source);
    println!();
    println!("  [OK] TOML structure is valid");
    println!("  [OK] All fields are valid");

    println!();
    println!("Configuration summary:");
    println!("  Log level         : {}", config.general.log_level);
    println!("  Remote            : {}", config.changelog.remote);
    println!("  Stat line limit   : {}", config.changelog.stat_line_limit);
    println!(
        "  Target candidates : {}",
        config.changelog.target_candidates.join(", ")
    );
    println!(
        "  Prefer incoming   : {}",
        if config.changelog.prefer_incoming {
            "on"
        } else {
            "off"
        }
    );
    println!();
    println!("Configuration is valid.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_init_writes_loadable_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        cmd_config_init(&path).unwrap();
        let config = ConventionsConfig::load_from_file(&path).unwrap();
        assert_eq!(config.changelog.remote, ConventionsConfig::default().changelog.remote);
    }

    #[test]
    fn test_config_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "# hand-edited\n").unwrap();

        let err = cmd_config_init(&path).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hand-edited\n");
    }

    #[test]
    fn test_changelog_flags_parse() {
        let cli = Cli::try_parse_from([
            "dev-conventions",
            "changelog",
            "--target",
            "main",
            "--prefer-incoming",
            "-y",
        ])
        .unwrap();
        match cli.command {
            Commands::Changelog {
                target,
                prefer_incoming,
                yes,
                rename_only,
                ..
            } => {
                assert_eq!(target.as_deref(), Some("main"));
                assert!(prefer_incoming && yes && !rename_only);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rename_only_conflicts_with_generate_only() {
        let parsed = Cli::try_parse_from([
            "dev-conventions",
            "changelog",
            "--rename-only",
            "--generate-only",
        ]);
        assert!(parsed.is_err());
    }
}
