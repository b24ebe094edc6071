//! Terminal progress reporting for chromosome scans

use assocplot_core::ProgressObserver;
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner} {msg} [{bar:40}] {pos}/{len} chromosomes ({elapsed_precise})";

/// Progress bar fed by the background worker
pub struct ScanProgress {
    bar: ProgressBar,
}

impl ScanProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet { ProgressBar::hidden() } else { ProgressBar::new(0) };
        match ProgressStyle::with_template(TEMPLATE) {
            Ok(style) => bar.set_style(style.progress_chars("=> ")),
            Err(err) => log::debug!("Falling back to default progress style: {}", err),
        }
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}

impl ProgressObserver for ScanProgress {
    fn on_progress(&self, task: &str, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
        self.bar.set_message(task.to_string());
    }
}
