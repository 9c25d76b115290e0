//! Operator-facing prompt and status-line façade.
//!
//! The workflow never talks to the terminal directly. The binary picks one
//! implementation at startup: an interactive one backed by real prompts, or
//! an always-default one for `--yes` and non-terminal runs.

use crate::errors::PromptError;

/// Styling hint for a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Info,
    Success,
    Warning,
    Error,
    /// Indented, dimmed detail under a previous line.
    Detail,
}

pub trait Console: Send + Sync {
    /// Whether prompts reach a human. When false every prompt returns its
    /// default and destructive menus fall back to manual instructions.
    fn is_interactive(&self) -> bool;

    fn say(&self, tone: Tone, message: &str);

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Choose one of `items`. `Ok(None)` means the operator cancelled.
    fn select(
        &self,
        prompt: &str,
        items: &[String],
        default: usize,
    ) -> Result<Option<usize>, PromptError>;

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError>;

    /// Start a long-running step. Consoles without progress display ignore it.
    fn begin_task(&self, _message: &str) {}

    fn end_task(&self) {}
}

/// Print a block of lines as details.
pub fn say_lines<'a>(console: &dyn Console, lines: impl IntoIterator<Item = &'a str>) {
    for line in lines {
        console.say(Tone::Detail, line);
    }
}
