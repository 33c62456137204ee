use comfy_table::Cell;

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim, status_label};
use super::tables::{color_coded_status_cell, create_table, header_cells};
use crate::commands::JobTree;
use crate::runner::RunOutcome;
use crate::status::StatusEntry;

pub fn print_job_tree(tree: &JobTree) {
    println!("{}", render_job_tree(tree));
}

pub fn render_job_tree(tree: &JobTree) -> String {
    let mut output = format!("{} {}\n", bright("🌲"), bright("Jobs").underlined());

    if tree.is_empty() {
        output.push_str(&format!("  {}\n", bright_yellow("No runnable jobs found.")));
        return output;
    }

    let mut table = create_table();
    table.set_header(header_cells(&["#", "Job", "Stage", "Status"]));

    for (idx, node) in tree.nodes.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&node.name),
            Cell::new(node.stage.as_deref().unwrap_or("-")),
            color_coded_status_cell(node.status),
        ]);
    }

    output.push_str(&format!("{table}\n"));
    output
}

/// Numbered job list, as offered by the job picker.
pub fn render_job_names(names: &[String]) -> String {
    names
        .iter()
        .enumerate()
        .map(|(idx, name)| format!("  {} {}\n", dim(format!("{:>2}.", idx + 1)), cyan(name)))
        .collect()
}

pub fn render_status(entries: &[StatusEntry]) -> String {
    if entries.is_empty() {
        return format!("{}\n", dim("No jobs have run yet."));
    }

    let mut table = create_table();
    table.set_header(header_cells(&["Job", "Status", "Updated"]));

    for entry in entries {
        table.add_row(vec![
            Cell::new(&entry.name),
            color_coded_status_cell(Some(entry.status)),
            Cell::new(entry.updated_at.format("%H:%M:%S UTC")),
        ]);
    }

    format!("{table}\n")
}

pub fn print_outcome(outcome: &RunOutcome) {
    println!("{}", render_outcome(outcome));
}

pub fn render_outcome(outcome: &RunOutcome) -> String {
    let mark = if outcome.success {
        bright_green("✓")
    } else {
        bright_red("✗")
    };
    let detail = match (outcome.exit_code, outcome.timed_out) {
        (_, true) => "timed out".to_string(),
        (Some(code), false) => format!("exit code {code}"),
        (None, false) => "terminated by signal".to_string(),
    };
    format!(
        "  {mark} {} {} {}",
        cyan(outcome.invocation.label()),
        dim(detail),
        dim(format!("{:.1}s", outcome.elapsed.as_secs_f64()))
    )
}

/// One-line view of the registry, printed whenever it changes.
pub fn render_status_line(entries: &[StatusEntry]) -> String {
    let parts: Vec<String> = entries
        .iter()
        .map(|entry| format!("{} {}", cyan(&entry.name), status_label(Some(entry.status))))
        .collect();
    format!("{} {}", dim("jobs:"), parts.join(&dim(" · ").to_string()))
}
