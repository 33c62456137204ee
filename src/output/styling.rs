use console::{style, StyledObject};

use crate::status::JobStatus;

pub fn bright_yellow(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().yellow()
}

pub fn bright_green(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().green()
}

pub fn bright_red(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright().red()
}

pub fn cyan(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).cyan()
}

pub fn dim(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).dim()
}

pub fn bright(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).bright()
}

pub fn magenta_bold(text: impl std::fmt::Display) -> StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Tree label for a job status; jobs that never ran get an empty label.
pub fn status_label(status: Option<JobStatus>) -> StyledObject<String> {
    match status {
        None => dim(""),
        Some(JobStatus::Running) => bright_yellow(JobStatus::Running.label()),
        Some(JobStatus::Succeeded) => bright_green(JobStatus::Succeeded.label()),
        Some(JobStatus::Failed) => bright_red(JobStatus::Failed.label()),
    }
}

pub fn warning(message: impl std::fmt::Display) -> String {
    format!("{} {}", bright_yellow("⚠"), bright_yellow(message))
}

pub fn error(message: impl std::fmt::Display) -> String {
    format!("{} {}", bright_red("✗"), bright_red(message))
}
