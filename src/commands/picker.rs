use std::io::{self, BufRead, Write};

use crate::error::Result;
use crate::output::{bright, render_job_names, warning};

/// Single-choice job selection.
pub trait JobPicker: Send + Sync {
    /// Returns the chosen job, or `None` if the user backed out.
    fn pick(&self, names: &[String]) -> Result<Option<String>>;
}

/// Prompts on stdin with a numbered list.
pub struct PromptPicker;

impl JobPicker for PromptPicker {
    fn pick(&self, names: &[String]) -> Result<Option<String>> {
        println!("{}", bright("Select a GitLab CI job to run locally"));
        print!("{}", render_job_names(names));
        print!("  [1-{}, empty to cancel]: ", names.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;

        let choice = choose(names, &input);
        if choice.is_none() && !input.trim().is_empty() {
            eprintln!("{}", warning(format!("No job matches '{}'", input.trim())));
        }
        Ok(choice)
    }
}

/// Maps picker input to a job. See [`find_by_ref`] for the accepted forms.
pub fn choose(names: &[String], input: &str) -> Option<String> {
    find_by_ref(names, String::as_str, input).cloned()
}

/// Finds an item by reference: an exact name, `#N` for the 1-based position N,
/// or a bare number as a position when no item has that name. Names take
/// precedence so that jobs named like numbers stay reachable.
pub(super) fn find_by_ref<'a, T>(
    items: &'a [T],
    name_of: impl Fn(&T) -> &str,
    input: &str,
) -> Option<&'a T> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let (position, allow_name) = match input.strip_prefix('#') {
        Some(rest) => (rest.trim().parse::<usize>().ok(), false),
        None => (input.parse::<usize>().ok(), true),
    };

    if allow_name {
        if let Some(item) = items.iter().find(|item| name_of(*item) == input) {
            return Some(item);
        }
    }

    position
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| items.get(i))
}
