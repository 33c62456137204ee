use std::borrow::Cow;
use std::io::Write;

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};

use crate::output::dim;

/// Line ending expected by the surface runner output is written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
}

impl LineEnding {
    /// Rewrites bare `\n` into this convention. Existing `\r\n` pairs are kept.
    pub fn translate(self, text: &str) -> Cow<'_, str> {
        match self {
            Self::Lf => Cow::Borrowed(text),
            Self::CrLf => {
                let mut out = String::with_capacity(text.len() + text.len() / 16);
                let mut previous = None;
                for c in text.chars() {
                    if c == '\n' && previous != Some('\r') {
                        out.push('\r');
                    }
                    out.push(c);
                    previous = Some(c);
                }
                Cow::Owned(out)
            }
        }
    }
}

/// Display surface for one run of the external runner.
///
/// The launcher only ever writes whole lines, already translated to
/// [`OutputSink::line_ending`].
pub trait OutputSink: Send + Sync {
    fn write(&self, text: &str);

    fn line_ending(&self) -> LineEnding {
        LineEnding::Lf
    }
}

/// Writes run output to stdout.
///
/// With a label, every line is prefixed so that concurrent runs stay
/// readable. With a progress bar, the bar is hidden while writing.
pub struct TerminalSink {
    label: Option<String>,
    line_ending: LineEnding,
    progress: Option<ProgressBar>,
}

impl TerminalSink {
    pub fn new(line_ending: LineEnding) -> Self {
        Self {
            label: None,
            line_ending,
            progress: None,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }
}

impl OutputSink for TerminalSink {
    fn write(&self, text: &str) {
        let rendered = match &self.label {
            Some(label) => prefix_lines(text, &dim(format!("[{label}]")).to_string()),
            None => text.to_string(),
        };

        let print = || {
            let mut stdout = std::io::stdout().lock();
            // Write errors on a closed stdout are ignored.
            let _ = stdout.write_all(rendered.as_bytes());
            let _ = stdout.flush();
        };

        match &self.progress {
            Some(pb) => pb.suspend(print),
            None => print(),
        }
    }

    fn line_ending(&self) -> LineEnding {
        self.line_ending
    }
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len() + prefix.len() + 1);
    for line in text.split_inclusive('\n') {
        if !line.trim_end_matches(['\r', '\n']).is_empty() {
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(line);
    }
    out
}

/// Collects run output in memory.
#[cfg(test)]
pub struct BufferSink {
    buffer: std::sync::Mutex<String>,
    line_ending: LineEnding,
}

#[cfg(test)]
impl BufferSink {
    pub fn new(line_ending: LineEnding) -> Self {
        Self {
            buffer: std::sync::Mutex::new(String::new()),
            line_ending,
        }
    }

    pub fn contents(&self) -> String {
        self.buffer.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl OutputSink for BufferSink {
    fn write(&self, text: &str) {
        self.buffer.lock().unwrap().push_str(text);
    }

    fn line_ending(&self) -> LineEnding {
        self.line_ending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lf_leaves_text_alone() {
        let text = "a\nb\r\nc";
        assert!(matches!(LineEnding::Lf.translate(text), Cow::Borrowed(t) if t == text));
    }

    #[test]
    fn test_crlf_translates_bare_newlines_only() {
        assert_eq!(LineEnding::CrLf.translate("a\nb\r\nc\n"), "a\r\nb\r\nc\r\n");
        assert_eq!(LineEnding::CrLf.translate("\n\n"), "\r\n\r\n");
        assert_eq!(LineEnding::CrLf.translate("no newline"), "no newline");
    }

    #[test]
    fn test_prefix_lines_skips_blank_lines() {
        assert_eq!(
            prefix_lines("one\n\ntwo\r\n", "[job]"),
            "[job] one\n\n[job] two\r\n"
        );
        assert_eq!(prefix_lines("partial", "[job]"), "[job] partial");
    }

    #[test]
    fn test_buffer_sink_collects_writes() {
        let sink = BufferSink::new(LineEnding::CrLf);
        sink.write("a\r\n");
        sink.write("b\r\n");
        assert_eq!(sink.contents(), "a\r\nb\r\n");
        assert_eq!(sink.line_ending(), LineEnding::CrLf);
    }
}
