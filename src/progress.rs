//! Progress display: a spinner while walking, a byte bar while mirroring.

use std::time::Duration;

use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use yadloader_core::{MirrorEvent, WalkProgress};

/// Spinner showing files found so far.
pub(crate) struct WalkSpinner {
    bar: Option<ProgressBar>,
}

impl WalkSpinner {
    pub(crate) fn new(enabled: bool) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Listing share...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(spinner) }
    }

    pub(crate) fn update(&self, progress: WalkProgress) {
        if let Some(bar) = &self.bar {
            bar.set_message(walk_message(progress));
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

fn walk_message(progress: WalkProgress) -> String {
    format!(
        "Listing share... {} files, {}",
        progress.files,
        HumanBytes(progress.bytes)
    )
}

/// Byte progress bar over the whole mirror run.
pub(crate) struct MirrorBar {
    bar: Option<ProgressBar>,
}

impl MirrorBar {
    pub(crate) fn new(enabled: bool, total_bytes: u64) -> Self {
        if !enabled {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(total_bytes);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner} [{elapsed_precise}] [{wide_bar}] {bytes}/{total_bytes} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar: Some(bar) }
    }

    pub(crate) fn on_event(&self, event: &MirrorEvent<'_>) {
        let Some(bar) = &self.bar else {
            return;
        };
        match event {
            MirrorEvent::Started { file, .. } => bar.set_message(file.path.clone()),
            MirrorEvent::Completed { report, .. } => bar.inc(report.bytes_written),
            // Failed files still count toward the total so the bar can finish.
            MirrorEvent::Failed { file, .. } => bar.inc(file.size),
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
