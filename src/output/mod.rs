mod jobs;
mod progress;
mod styling;
mod tables;

pub use jobs::{
    print_job_tree, print_outcome, render_job_names, render_status, render_status_line,
};
pub use progress::RunProgress;
pub use styling::{bright, cyan, dim, error, magenta_bold, warning};

/// Prints the glci banner to stderr.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🦊 glci"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Run GitLab CI jobs locally")
    );
}
