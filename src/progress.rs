use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use x_checker::api::TaskRecord;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ";

pub struct ApiProgress {
    bar: ProgressBar,
}

impl ApiProgress {
    fn spinner(template: &str, message: &str, tick: Duration) -> Self {
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICKS);

        let bar = ProgressBar::new_spinner();
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(tick);

        Self { bar }
    }

    pub fn new_upload() -> Self {
        Self::spinner(
            "🚀 {msg} {spinner:.green}",
            "Uploading phone numbers...",
            Duration::from_millis(80),
        )
    }

    pub fn new_polling() -> Self {
        Self::spinner(
            "⏳ {msg} {spinner:.yellow}",
            "Checking task status...",
            Duration::from_millis(120),
        )
    }

    pub fn new_download() -> Self {
        Self::spinner(
            "📥 {msg} {spinner:.cyan}",
            "Downloading results...",
            Duration::from_millis(100),
        )
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Poll observer: one line summary of a snapshot.
    pub fn observe(&self, task: &TaskRecord) {
        self.set_message(&format!(
            "Status: {}, Success: {}, Failure: {}, Total: {}",
            task.status, task.success, task.failure, task.total
        ));
    }

    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}
