//! Progress reporting for long-running retrievals.
//!
//! The pipeline reports coarse stage progress (0-100) through the
//! [`ProgressReporter`] trait. The CLI plugs in an indicatif bar; library
//! callers and tests use [`SilentProgress`] or their own sink.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::sync::Mutex;

/// Receives stage progress from the pipeline.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Records every update, useful for asserting on stage ordering.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<(u8, String)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(u8, String)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, percent: u8, message: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push((percent, message.to_string()));
        }
    }
}

/// Terminal progress bar for a single retrieval
pub struct ProgressBar {
    bar: IndicatifBar,
}

impl ProgressBar {
    /// Create a percentage bar for pipeline stages
    pub fn new(label: &str) -> Self {
        let bar = IndicatifBar::new(100);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{bar:40.cyan/blue}] {percent:>3}% {msg} ({elapsed})")
                .expect("Invalid progress bar template")
                .progress_chars("█░"),
        );
        bar.set_prefix(label.to_string());

        Self { bar }
    }

    /// Create a hidden bar, for non-interactive output
    pub fn hidden() -> Self {
        Self {
            bar: IndicatifBar::hidden(),
        }
    }

    /// Remove the bar from the terminal
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for ProgressBar {
    fn report(&self, percent: u8, message: &str) {
        self.bar.set_position(u64::from(percent.min(100)));
        self.bar.set_message(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_progress_keeps_order() {
        let progress = RecordingProgress::new();
        progress.report(10, "start");
        progress.report(50, "halfway");
        progress.report(100, "done");

        let events = progress.events();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], (10, "start".to_string()));
        assert_eq!(events[2].0, 100);
    }

    #[test]
    fn test_hidden_bar_accepts_updates() {
        let bar = ProgressBar::hidden();
        bar.report(42, "polling");
        bar.report(250, "clamped");
        bar.clear();
    }
}
