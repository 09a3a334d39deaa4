//src/progress.rs

use indicatif::{HumanCount, ProgressBar, ProgressStyle};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Redraw the read counter every this many reads.
const UPDATE_INTERVAL: u64 = 100;

/// Spinner that counts reads on stderr. Hidden automatically when stderr is
/// not a terminal.
pub struct ReadCounter {
    spinner: ProgressBar,
    count: u64,
}

impl ReadCounter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .tick_strings(TICKS)
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message("Reads: 0");
        Self { spinner, count: 0 }
    }

    pub fn inc(&mut self) {
        self.count += 1;
        if self.count == 1 || self.count % UPDATE_INTERVAL == 0 {
            self.spinner
                .set_message(format!("Reads: {}", HumanCount(self.count)));
            self.spinner.tick();
        }
    }

    pub fn finish(self) -> u64 {
        self.spinner.finish_and_clear();
        self.count
    }
}

impl Default for ReadCounter {
    fn default() -> Self {
        Self::new()
    }
}
