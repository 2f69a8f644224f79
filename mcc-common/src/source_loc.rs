//! Source location tracking for error reporting
//!
//! Locations are recorded against the original source files even when the
//! text being scanned is a macro expansion buffer; in that case the
//! preprocessor substitutes the location of the invocation site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A location in a source file (line and column are 1-based)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub filename: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(filename: &str, line: u32, column: u32) -> Self {
        Self {
            filename: filename.to_string(),
            line,
            column,
        }
    }

    /// Location used when no source file is known (expansion buffers
    /// whose invocation site was lost, unit tests)
    pub fn unknown() -> Self {
        Self::new("<unknown>", 0, 0)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_location_display() {
        let loc = SourceLocation::new("test.c", 42, 10);
        assert_eq!(loc.filename, "test.c");
        assert_eq!(format!("{}", loc), "test.c:42:10");
    }

    #[test]
    fn test_unknown_location() {
        let loc = SourceLocation::unknown();
        assert_eq!(format!("{}", loc), "<unknown>:0:0");
    }
}
