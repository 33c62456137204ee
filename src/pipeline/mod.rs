mod document;
mod filter;

pub use document::{extract_job_names, PipelineDocument};
pub use filter::JobFilter;
