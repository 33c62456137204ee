use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::status::JobStatus;

pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn header_cells(titles: &[&str]) -> Vec<Cell> {
    titles
        .iter()
        .map(|title| Cell::new(title).fg(TableColor::Cyan))
        .collect()
}

pub fn color_coded_status_cell(status: Option<JobStatus>) -> Cell {
    match status {
        None => Cell::new(""),
        Some(JobStatus::Running) => Cell::new(JobStatus::Running.label()).fg(TableColor::Yellow),
        Some(JobStatus::Succeeded) => {
            Cell::new(JobStatus::Succeeded.label()).fg(TableColor::Green)
        }
        Some(JobStatus::Failed) => Cell::new(JobStatus::Failed.label()).fg(TableColor::Red),
    }
}
