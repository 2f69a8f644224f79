//! Line/column tracking over a file-backed stream
//!
//! The tracker follows the read cursor of the current source file. Memory
//! streams carry no tracker; diagnostics there use the invocation site
//! saved by the caller.

use mcc_common::SourceLocation;

#[derive(Debug, Clone)]
pub struct LocationTracker {
    filename: String,
    line: u32,
    /// Stream position where the current line begins
    line_begin: usize,
    column: u32,
}

impl LocationTracker {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            line: 1,
            line_begin: 0,
            column: 1,
        }
    }

    /// A line break was consumed; `position` is the cursor just past it
    pub fn line_break(&mut self, position: usize) {
        self.line += 1;
        self.line_begin = position;
        self.column = 1;
    }

    /// Recompute the column for the given cursor position
    pub fn search_from(&mut self, position: usize) {
        self.column = (position.saturating_sub(self.line_begin) + 1) as u32;
    }

    /// Mark the start of a substituted region
    pub fn update_begin(&mut self, position: usize) {
        self.search_from(position);
    }

    /// Mark the end of a substituted region
    pub fn update_end(&mut self, position: usize) {
        self.search_from(position);
    }

    /// Immutable snapshot for diagnostics
    pub fn snapshot(&self) -> SourceLocation {
        SourceLocation::new(&self.filename, self.line, self.column)
    }
}
