use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright_green, bright_red, bright_yellow};

/// Spinner shown while one-shot runs are in progress.
///
/// Runner output is printed above it through [`ProgressBar::suspend`].
pub struct RunProgress {
    pb: ProgressBar,
}

impl RunProgress {
    pub fn start(what: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_draw_target(ProgressDrawTarget::stderr());
        if let Ok(spinner) = ProgressStyle::default_spinner().template("  {msg} {spinner}") {
            pb.set_style(spinner);
        }
        pb.set_message(bright_yellow(format!("Running {what}")).to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn bar(&self) -> ProgressBar {
        self.pb.clone()
    }

    pub fn finish(self, what: &str, success: bool) {
        let message = if success {
            bright_green(format!("{what} succeeded ✓"))
        } else {
            bright_red(format!("{what} failed ✗"))
        };
        self.pb.finish_with_message(message.to_string());
    }
}
