//! Macro preprocessor for the mcc compiler
//!
//! The engine consumes source text and produces an expanded stream. It
//! works directly on characters: comments and line splices are skipped
//! by the scanning layer, directives are recognized at line starts, and
//! macro invocations are expanded by re-entering the main loop on an
//! in-memory buffer whose output half is swapped with the caller's.
//!
//! Failures never unwind through the call stack. Every error is logged
//! against the current location and parsing continues after skipping to
//! the end of the directive line.

pub mod linker;
pub mod loc;
pub mod storage;
pub mod stream;

mod directives;
mod expand;
mod scan;
#[cfg(test)]
mod tests;

pub use linker::{Linker, LinkerError};
pub use storage::Storage;
pub use stream::Stream;

use loc::LocationTracker;
use mcc_common::{DiagnosticReporter, ErrorKind, SourceLocation, WarningKind};

pub(crate) const MAX_INCLUDE_DEPTH: usize = 32;
pub(crate) const MAX_CALL_DEPTH: usize = 256;
pub(crate) const MAX_ITERATION: usize = 32768;

/// The preprocessor engine
///
/// `io` always holds the active input and the active output; nested
/// expansion replaces it wholesale and swaps the output half so the
/// nested frame writes where the caller was writing.
pub struct Preprocessor<'l> {
    linker: &'l mut Linker,
    pub(crate) storage: Storage,
    pub(crate) io: Stream,
    pub(crate) loc: Option<LocationTracker>,
    /// Invocation-site location used while scanning memory buffers
    pub(crate) prev: Option<SourceLocation>,
    pub(crate) reporter: DiagnosticReporter,
    pub(crate) include_depth: usize,
    pub(crate) call_depth: usize,
    pub(crate) iterations: usize,
    pub(crate) recovery_disabled: bool,
    pub(crate) line_required: bool,
    pub(crate) was_error: bool,
}

impl<'l> Preprocessor<'l> {
    pub fn new(linker: &'l mut Linker) -> Self {
        Self {
            linker,
            storage: Storage::new(),
            io: Stream::sink(),
            loc: None,
            prev: None,
            reporter: DiagnosticReporter::new(),
            include_depth: 0,
            call_depth: 0,
            iterations: 0,
            recovery_disabled: false,
            line_required: false,
            was_error: false,
        }
    }

    /// Suppress diagnostics after the first error while still parsing,
    /// so position state stays valid
    pub fn disable_recovery(&mut self, status: bool) {
        self.recovery_disabled = status;
    }

    pub fn reporter(&self) -> &DiagnosticReporter {
        &self.reporter
    }

    pub fn into_reporter(self) -> DiagnosticReporter {
        self.reporter
    }

    /// Preprocess a file registered with the linker into a string
    pub fn preprocess(&mut self, file_id: usize) -> String {
        let content = self.linker.content(file_id).to_string();
        let filename = self.linker.filename(file_id);

        let mut input = Stream::from_file(&content, file_id);
        input.set_output_buffer();
        self.io = input;
        self.loc = Some(LocationTracker::new(&filename));
        self.line_required = true;
        self.iterations = 0;

        self.run();

        self.loc = None;
        self.io.extract_output_buffer()
    }

    /// One pass of the main loop: directives at line starts, expansion
    /// everywhere else, until the active input is exhausted
    pub(crate) fn run(&mut self) {
        loop {
            if !self.io.is_file() {
                // cycle guard over one top-level expansion
                self.iterations += 1;
                if self.iterations > MAX_ITERATION {
                    self.error_here(ErrorKind::ExpansionOverflow);
                    break;
                }
            }
            match self.parse_directive() {
                directives::DirectiveOutcome::Keyword(keyword, loc, name) => {
                    self.dispatch(keyword, &loc, &name);
                }
                directives::DirectiveOutcome::Text => {
                    if self.parse_until().is_none() {
                        break;
                    }
                }
                directives::DirectiveOutcome::Eof => break,
            }
        }
    }

    fn dispatch(&mut self, keyword: usize, loc: &SourceLocation, name: &str) {
        use storage::{KW_DEFINE, KW_INCLUDE, KW_LINE, KW_SET, KW_UNDEF};
        match keyword {
            KW_LINE => self.parse_line(loc),
            KW_INCLUDE => self.parse_include(loc),
            KW_DEFINE => self.parse_define(name),
            KW_SET => self.parse_set(name),
            KW_UNDEF => self.parse_undef(name),
            _ => {
                // conditional compilation and user macro blocks are
                // recognized but not implemented
                self.error_at(
                    ErrorKind::DirectiveNotSupported(name.trim_start_matches('#').to_string()),
                    loc,
                );
                self.skip_directive();
            }
        }
    }

    // Location and diagnostic helpers

    /// Snapshot of the current location; memory streams report the saved
    /// invocation site
    pub(crate) fn loc_copy(&mut self) -> SourceLocation {
        let position = self.io.position();
        match &mut self.loc {
            Some(tracker) => {
                tracker.search_from(position);
                tracker.snapshot()
            }
            None => self
                .prev
                .clone()
                .unwrap_or_else(SourceLocation::unknown),
        }
    }

    /// Clone the tracker so scanning can be rewound together with a
    /// `seek` on the input
    pub(crate) fn tracker_copy(&self) -> Option<LocationTracker> {
        self.loc.clone()
    }

    pub(crate) fn tracker_restore(&mut self, saved: Option<LocationTracker>) {
        if saved.is_some() {
            self.loc = saved;
        }
    }

    pub(crate) fn loc_search_from(&mut self) {
        let position = self.io.position();
        if let Some(tracker) = &mut self.loc {
            tracker.search_from(position);
        }
    }

    pub(crate) fn line_break(&mut self) {
        let position = self.io.position();
        if let Some(tracker) = &mut self.loc {
            tracker.line_break(position);
        }
    }

    pub(crate) fn error_at(&mut self, kind: ErrorKind, loc: &SourceLocation) {
        if self.recovery_disabled && self.was_error {
            return;
        }
        let location = if self.io.is_file() {
            loc.clone()
        } else {
            self.prev.clone().unwrap_or_else(SourceLocation::unknown)
        };
        log::debug!("error at {}: {}", location, kind);
        self.reporter.error(kind, location);
        self.was_error = true;
    }

    pub(crate) fn error_here(&mut self, kind: ErrorKind) {
        let loc = self.loc_copy();
        self.error_at(kind, &loc);
    }

    pub(crate) fn warning_at(&mut self, kind: WarningKind, loc: &SourceLocation) {
        if self.recovery_disabled {
            return;
        }
        let location = if self.io.is_file() {
            loc.clone()
        } else {
            self.prev.clone().unwrap_or_else(SourceLocation::unknown)
        };
        self.reporter.warning(kind, location);
    }

    pub(crate) fn warning_here(&mut self, kind: WarningKind) {
        let loc = self.loc_copy();
        self.warning_at(kind, &loc);
    }

    // Output helpers

    pub(crate) fn print_char(&mut self, ch: char) {
        self.io.print_char(ch);
    }

    pub(crate) fn print_str(&mut self, text: &str) {
        self.io.print_str(text);
    }

    /// Run `f` with the output redirected to a fresh buffer; returns its
    /// result together with everything it printed
    pub(crate) fn capture_output<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> (R, String) {
        let mut hold = Stream::sink();
        self.io.swap_output(&mut hold);
        self.io.set_output_buffer();
        let result = f(self);
        let text = self.io.extract_output_buffer();
        self.io.swap_output(&mut hold);
        (result, text)
    }

    // Nested engine entries

    /// Re-enter the main loop on a memory buffer, writing into the
    /// current output
    pub(crate) fn preprocess_nested(&mut self, text: &str) {
        let mut input = Stream::from_buffer(text);
        self.io.swap_output(&mut input);
        let saved_io = std::mem::replace(&mut self.io, input);
        let saved_loc = self.loc.take();
        let saved_line_required = self.line_required;
        self.line_required = true;

        self.run();

        self.line_required = saved_line_required;
        self.loc = saved_loc;
        let mut inner = std::mem::replace(&mut self.io, saved_io);
        self.io.swap_output(&mut inner);
    }

    /// Re-enter the main loop on a memory buffer, collecting the output
    /// into a fresh string
    pub(crate) fn preprocess_to_string(&mut self, text: &str) -> String {
        let mut input = Stream::from_buffer(text);
        input.set_output_buffer();
        let saved_io = std::mem::replace(&mut self.io, input);
        let saved_loc = self.loc.take();
        let saved_line_required = self.line_required;
        self.line_required = true;

        self.run();

        self.line_required = saved_line_required;
        self.loc = saved_loc;
        let mut inner = std::mem::replace(&mut self.io, saved_io);
        inner.extract_output_buffer()
    }

    /// Re-enter the main loop on an included file
    pub(crate) fn preprocess_header(&mut self, file_id: usize) {
        let content = self.linker.content(file_id).to_string();
        let filename = self.linker.filename(file_id);

        let mut input = Stream::from_file(&content, file_id);
        self.io.swap_output(&mut input);
        let saved_io = std::mem::replace(&mut self.io, input);
        let saved_loc = self.loc.replace(LocationTracker::new(&filename));
        let saved_line_required = self.line_required;
        self.line_required = true;

        self.run();

        self.line_required = saved_line_required;
        self.loc = saved_loc;
        let mut inner = std::mem::replace(&mut self.io, saved_io);
        self.io.swap_output(&mut inner);
    }
}
