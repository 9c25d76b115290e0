//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create an informational string (blue arrow).
pub fn info(msg: &str) -> String {
    let style = Style::new().blue();
    format!("{} {}", style.apply_to("›"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// Label for a saved workflow stage (cyan).
pub fn stage(name: &str) -> String {
    let style = Style::new().cyan().bold();
    style.apply_to(name).to_string()
}

/// Status indicator: workflow in progress (yellow dot).
pub fn status_in_progress() -> String {
    let style = Style::new().yellow();
    format!("{} In progress", style.apply_to("●"))
}

/// Status indicator: no workflow (dim dot).
pub fn status_idle() -> String {
    let style = Style::new().dim();
    format!("{} No workflow in progress", style.apply_to("○"))
}
