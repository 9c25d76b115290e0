//! Target branch selection.

use tracing::{debug, info};

use crate::config::ChangelogConfig;
use crate::console::{Console, Tone};
use crate::errors::{CoreError, GitError, WorkflowError};
use crate::git::GitClient;

/// Answer to the target menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Branch(String),
    Quit,
}

/// Conventional branches available as merge targets, in allow-list order.
///
/// Remote-tracking branches of the configured remote are preferred; local
/// branches are used when the remote has none. Nothing is fetched.
pub fn candidates(git: &GitClient, config: &ChangelogConfig) -> Result<Vec<String>, GitError> {
    let remote = if git.has_remote(&config.remote) {
        git.remote_branches(&config.remote)?
    } else {
        Vec::new()
    };
    let mut found = filter_allowed(&config.target_candidates, &remote);
    if found.is_empty() {
        found = filter_allowed(&config.target_candidates, &git.local_branches()?);
    }
    debug!(?found, "target candidates");
    Ok(found)
}

fn filter_allowed(allowed: &[String], branches: &[String]) -> Vec<String> {
    allowed
        .iter()
        .filter(|name| branches.contains(name))
        .cloned()
        .collect()
}

/// Index of the preselected candidate: `main`, then `master`, then the first.
pub fn default_index(candidates: &[String]) -> usize {
    ["main", "master"]
        .iter()
        .find_map(|preferred| candidates.iter().position(|c| c == preferred))
        .unwrap_or(0)
}

/// Interpret a menu answer: a 1-based index, a branch name, or `q` to quit.
pub fn parse_selection(answer: &str, candidates: &[String]) -> Result<Selection, WorkflowError> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(WorkflowError::InvalidSelection(answer.to_string()));
    }
    if answer.eq_ignore_ascii_case("q") || answer.eq_ignore_ascii_case("quit") {
        return Ok(Selection::Quit);
    }
    if let Ok(n) = answer.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| candidates.get(i))
            .map(|name| Selection::Branch(name.clone()))
            .ok_or_else(|| WorkflowError::InvalidSelection(answer.to_string()));
    }
    Ok(Selection::Branch(answer.to_string()))
}

/// Resolve the merge target. An explicit name is used verbatim.
///
/// Returns `Ok(None)` when the operator quits the menu.
pub fn resolve_target(
    git: &GitClient,
    config: &ChangelogConfig,
    console: &dyn Console,
    explicit: Option<&str>,
    current: &str,
) -> Result<Option<String>, CoreError> {
    let target = match explicit {
        Some(name) => name.to_string(),
        None => {
            let found = candidates(git, config)?;
            if found.is_empty() {
                let allowed = config.target_candidates.join(", ");
                return Err(WorkflowError::NoTargetCandidates(allowed).into());
            }
            let default = default_index(&found);
            if console.is_interactive() {
                console.say(Tone::Heading, "Select the target branch:");
                for (i, name) in found.iter().enumerate() {
                    let marker = if i == default { " (default)" } else { "" };
                    console.say(Tone::Detail, &format!("{}) {}{}", i + 1, name, marker));
                }
                let answer = console.input(
                    "Target branch (number, name, or q to quit)",
                    Some(&found[default]),
                )?;
                match parse_selection(&answer, &found)? {
                    Selection::Branch(name) => name,
                    Selection::Quit => return Ok(None),
                }
            } else {
                found[default].clone()
            }
        }
    };

    if target == current {
        return Err(WorkflowError::AlreadyOnTarget(target).into());
    }
    info!(%target, "selected target branch");
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filter_keeps_allow_list_order() {
        let allowed = names(&["main", "master", "dev", "develop", "staging"]);
        let branches = names(&["staging", "feature/a", "dev", "main"]);
        assert_eq!(filter_allowed(&allowed, &branches), names(&["main", "dev", "staging"]));
    }

    #[test]
    fn test_default_prefers_main_then_master() {
        assert_eq!(default_index(&names(&["dev", "master", "main"])), 2);
        assert_eq!(default_index(&names(&["dev", "master"])), 1);
        assert_eq!(default_index(&names(&["develop", "staging"])), 0);
    }

    #[test]
    fn test_parse_selection_by_index_and_name() {
        let c = names(&["main", "dev"]);
        assert_eq!(parse_selection("2", &c).unwrap(), Selection::Branch("dev".into()));
        assert_eq!(
            parse_selection(" release ", &c).unwrap(),
            Selection::Branch("release".into())
        );
        assert_eq!(parse_selection("Q", &c).unwrap(), Selection::Quit);
    }

    #[test]
    fn test_parse_selection_rejects_out_of_range() {
        let c = names(&["main"]);
        assert!(matches!(
            parse_selection("0", &c),
            Err(WorkflowError::InvalidSelection(_))
        ));
        assert!(matches!(
            parse_selection("5", &c),
            Err(WorkflowError::InvalidSelection(_))
        ));
        assert!(parse_selection("   ", &c).is_err());
    }
}
