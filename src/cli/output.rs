//! Output formatting and progress indicators
//!
//! Progress goes to a single spinner driven by pipeline events. Errors are
//! printed on one line to stderr.

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::sync::Arc;

use crate::core::pipeline::{EventCallback, PipelineEvent};

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Spinner message for a pipeline event
pub fn event_message(event: &PipelineEvent<'_>) -> String {
    match event {
        PipelineEvent::PackageStarted {
            package,
            index,
            total,
        } => format!("[{}/{total}] {package}", index + 1),
        PipelineEvent::StageStarted { package, stage } => format!("{package}: {stage}"),
        PipelineEvent::Downloading {
            package,
            downloaded,
            total,
        } if *total > 0 => format!(
            "{package}: fetch {}/{}",
            HumanBytes(*downloaded),
            HumanBytes(*total)
        ),
        PipelineEvent::Downloading {
            package, downloaded, ..
        } => format!("{package}: fetch {}", HumanBytes(*downloaded)),
    }
}

/// Shows pipeline progress on a spinner
pub struct BuildProgress {
    spinner: ProgressBar,
}

impl BuildProgress {
    /// Start the spinner
    pub fn new() -> Self {
        Self {
            spinner: create_spinner("Building external dependencies"),
        }
    }

    /// Event callback that updates the spinner
    pub fn callback(&self) -> EventCallback {
        let spinner = self.spinner.clone();
        Arc::new(move |event| spinner.set_message(event_message(event)))
    }

    /// Stop the spinner, leaving a final line
    pub fn finish(&self, message: &str) {
        self.spinner.finish_with_message(message.to_string());
    }

    /// Stop the spinner and erase it
    pub fn abandon(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Default for BuildProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line report for a run-aborting error
///
/// Captured subprocess stderr can span many lines; they are joined with
/// ` | ` and blank lines are dropped.
pub fn error_line(error: &anyhow::Error) -> String {
    let message = error
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ");
    format!("{} Building external dependencies failed: {message}", status::ERROR)
}

/// Print a run-aborting error to stderr
pub fn display_error(error: &anyhow::Error) {
    tracing::debug!("Full error: {error:?}");
    eprintln!("{}", error_line(error));
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";
}
