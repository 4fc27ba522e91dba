//! User-facing progress and error output.
//!
//! Progress goes to stdout and problems to stderr, both through injected
//! writers. Titles are bold, errors red and warnings yellow when the
//! destination stream supports colour; `--quiet` silences progress only.

use crate::checksum::ArchiveDigest;
use crate::error::{PackagerError, Result};
use camino::Utf8Path;
use owo_colors::{OwoColorize, Stream};
use std::fmt::Display;
use std::io::Write;

/// Writes progress, warnings and errors for a packaging run.
pub struct Reporter<'a> {
    stdout: &'a mut dyn Write,
    stderr: &'a mut dyn Write,
    quiet: bool,
    colors: bool,
}

impl<'a> Reporter<'a> {
    /// Plain-text reporter, as used in tests and when output is piped.
    pub fn new(stdout: &'a mut dyn Write, stderr: &'a mut dyn Write) -> Self {
        Self {
            stdout,
            stderr,
            quiet: false,
            colors: false,
        }
    }

    /// Suppress progress output.
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Style output when the process streams are terminals.
    #[must_use]
    pub fn colored(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    /// Start a section, e.g. `Building packages/clock`.
    pub fn title(&mut self, text: impl Display) {
        if self.quiet {
            return;
        }
        let text = text.to_string();
        let line = if self.colors {
            text.if_supports_color(Stream::Stdout, |t| t.bold()).to_string()
        } else {
            text
        };
        write_line(self.stdout, "");
        write_line(self.stdout, line);
    }

    /// Report one step of the current section.
    pub fn step(&mut self, text: impl Display) {
        if !self.quiet {
            write_line(self.stdout, format!("--> {text}"));
        }
    }

    /// Report a produced archive and its digest.
    pub fn built(&mut self, archive: &Utf8Path, digest: &ArchiveDigest) {
        self.step(format!("Built {archive} (sha256 {})", digest.short()));
    }

    /// Report a problem that does not stop the run.
    pub fn warn(&mut self, text: impl Display) {
        let line = format!("WARNING: {text}");
        let line = if self.colors {
            line.if_supports_color(Stream::Stderr, |t| t.yellow()).to_string()
        } else {
            line
        };
        write_line(self.stderr, line);
    }

    /// Report an error.
    pub fn error(&mut self, err: &PackagerError) {
        let line = format!("ERROR: {err}");
        let line = if self.colors {
            line.if_supports_color(Stream::Stderr, |t| t.red()).to_string()
        } else {
            line
        };
        write_line(self.stderr, line);
    }

    /// Print the closing summary line. Shown even in quiet mode.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::WriteFailed`] if stdout cannot be written.
    pub fn summary(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.stdout, "{text}").map_err(|source| PackagerError::WriteFailed { source })
    }
}

fn write_line(out: &mut dyn Write, message: impl Display) {
    if writeln!(out, "{message}").is_err() {
        // Progress output is best effort.
    }
}
