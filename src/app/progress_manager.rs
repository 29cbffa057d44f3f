//! Progress UI (spinner) for batch runs.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use joblo_core::WorkItem;
use joblo_core::batch::{BatchObserver, ItemStatus, PauseKind};

/// Renders scheduler events on a spinner.
pub(crate) struct SpinnerObserver {
    spinner: ProgressBar,
    total: usize,
}

impl SpinnerObserver {
    /// Starts a spinner for a batch of `total` items.
    pub(crate) fn start(total: usize) -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        Self { spinner, total }
    }

    /// Removes the spinner from the terminal.
    pub(crate) fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl BatchObserver for SpinnerObserver {
    fn item_started(&self, index: usize, item: &WorkItem) {
        self.spinner.set_message(format!(
            "[{}/{}] Scraping {}...",
            (index + 1).min(self.total),
            self.total,
            item.target
        ));
    }

    fn item_finished(&self, index: usize, item: &WorkItem) {
        let label = match item.status() {
            ItemStatus::Succeeded => "done",
            ItemStatus::Failed => "failed",
            ItemStatus::Skipped | ItemStatus::Pending => "skipped",
        };
        self.spinner.println(format!(
            "[{}/{}] {label}: {}",
            index + 1,
            self.total,
            item.target
        ));
    }

    fn pausing(&self, kind: PauseKind, delay: Duration) {
        if kind == PauseKind::Batch {
            self.spinner.set_message(format!(
                "Batch pause: waiting {}s before the next batch...",
                delay.as_secs()
            ));
        }
    }
}
