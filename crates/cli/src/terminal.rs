//! Console implementations for the binary.
//!
//! [`TerminalConsole`] prompts through dialoguer and shows indicatif
//! spinners for long steps. [`AutoConsole`] answers every prompt with its
//! default and is used for `--yes` and when stdin is not a terminal.

use std::sync::Mutex;
use std::time::Duration;

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use dev_conventions_core::console::{Console, Tone};
use dev_conventions_core::errors::PromptError;

use crate::style;

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn render(tone: Tone, message: &str) -> String {
    match tone {
        Tone::Heading => style::header(message),
        Tone::Info => style::info(message),
        Tone::Success => style::success(message),
        Tone::Warning => style::warn(message),
        Tone::Error => style::error(message),
        Tone::Detail => format!("    {}", style::dim(message)),
    }
}

fn emit(tone: Tone, message: &str) {
    let line = render(tone, message);
    match tone {
        Tone::Warning | Tone::Error => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

fn prompt_error(e: dialoguer::Error) -> PromptError {
    PromptError::Io(e.to_string())
}

// ---------------------------------------------------------------------------
// Interactive
// ---------------------------------------------------------------------------

pub struct TerminalConsole {
    theme: ColorfulTheme,
    spinner: Mutex<Option<ProgressBar>>,
}

impl TerminalConsole {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
            spinner: Mutex::new(None),
        }
    }
}

impl Console for TerminalConsole {
    fn is_interactive(&self) -> bool {
        true
    }

    fn say(&self, tone: Tone, message: &str) {
        match self.spinner.lock() {
            Ok(guard) => match guard.as_ref() {
                Some(spinner) => spinner.suspend(|| emit(tone, message)),
                None => emit(tone, message),
            },
            Err(_) => emit(tone, message),
        }
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(prompt_error)
    }

    fn select(
        &self,
        prompt: &str,
        items: &[String],
        default: usize,
    ) -> Result<Option<usize>, PromptError> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact_opt()
            .map_err(prompt_error)
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme).with_prompt(prompt);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        input.interact_text().map_err(prompt_error)
    }

    fn begin_task(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
            spinner.set_style(template.tick_strings(SPINNER_TICKS));
        }
        spinner.set_message(format!("{}...", message));
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(previous) = guard.replace(spinner) {
                previous.finish_and_clear();
            }
        }
    }

    fn end_task(&self) {
        if let Ok(mut guard) = self.spinner.lock() {
            if let Some(spinner) = guard.take() {
                spinner.finish_and_clear();
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Non-interactive
// ---------------------------------------------------------------------------

/// Takes every default without asking.
pub struct AutoConsole;

impl Console for AutoConsole {
    fn is_interactive(&self) -> bool {
        false
    }

    fn say(&self, tone: Tone, message: &str) {
        emit(tone, message);
    }

    fn confirm(&self, prompt: &str, _default: bool) -> Result<bool, PromptError> {
        debug!(prompt, "auto-confirmed");
        emit(Tone::Detail, &format!("{} yes", prompt));
        Ok(true)
    }

    fn select(
        &self,
        prompt: &str,
        items: &[String],
        default: usize,
    ) -> Result<Option<usize>, PromptError> {
        let choice = items.get(default).map(String::as_str).unwrap_or("");
        debug!(prompt, choice, "auto-selected default");
        Ok(Some(default))
    }

    fn input(&self, prompt: &str, default: Option<&str>) -> Result<String, PromptError> {
        default
            .map(str::to_string)
            .ok_or_else(|| PromptError::NoDefault(prompt.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_console_takes_defaults() {
        let console = AutoConsole;
        assert!(!console.is_interactive());
        assert!(console.confirm("Proceed?", false).unwrap());
        let items = vec!["a".to_string(), "b".to_string()];
        assert_eq!(console.select("Pick", &items, 1).unwrap(), Some(1));
        assert_eq!(console.input("Name", Some("main")).unwrap(), "main");
        assert!(matches!(
            console.input("Phrase", None),
            Err(PromptError::NoDefault(_))
        ));
    }

    #[test]
    fn test_detail_lines_are_indented() {
        assert!(render(Tone::Detail, "x").starts_with("    "));
    }
}
