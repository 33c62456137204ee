mod invocation;
mod launcher;
mod locator;
mod sink;

pub use invocation::Invocation;
pub use launcher::{JobLauncher, RunOutcome};
pub use locator::resolve_executable;
#[cfg(test)]
pub use sink::BufferSink;
pub use sink::{LineEnding, TerminalSink};
