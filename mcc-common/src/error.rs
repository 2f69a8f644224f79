//! Diagnostics for the mcc compiler
//!
//! Preprocessor and codegen failures are never raised through the call
//! stack. They are logged here against the offending location and the
//! caller keeps parsing; the driver decides the exit code from the
//! accumulated counts.

use crate::source_loc::SourceLocation;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Preprocessor error kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("unterminated block comment")]
    CommentUnterminated,
    #[error("missing terminating {0} character")]
    StringUnterminated(char),
    #[error("#include nested too deeply")]
    IncludeDepth,
    #[error("#include expects \"FILENAME\" or <FILENAME>")]
    IncludeExpectsFilename,
    #[error("no such file in include paths")]
    IncludeNoSuchFile,
    #[error("invalid preprocessing directive #{0}")]
    DirectiveInvalid(String),
    #[error("no macro name given in {0} directive")]
    DirectiveNameNon(String),
    #[error("directive #{0} is recognized but not supported")]
    DirectiveNotSupported(String),
    #[error("macro names must start with a letter")]
    MacroNameFirstCharacter,
    #[error("\"{0}\" redefined")]
    MacroNameRedefine(String),
    #[error("macro call depth limit exceeded")]
    CallDepth,
    #[error("macro expansion iteration limit exceeded")]
    ExpansionOverflow,
    #[error("macro \"{0}\" requires arguments")]
    ArgsNon(String),
    #[error("macro \"{0}\" requires {1} arguments, but only {2} given")]
    ArgsRequires(String, usize, usize),
    #[error("macro \"{0}\" passed {2} arguments, but takes just {1}")]
    ArgsPassed(String, usize, usize),
    #[error("unterminated argument list invoking macro \"{0}\"")]
    ArgsUnterminated(String),
    #[error("expected ')' in macro parameter list")]
    ArgsExpectedBracket,
    #[error("expected parameter name, found '{0}'")]
    ArgsExpectedName(char),
    #[error("expected ',' or ')' in macro parameter list, found '{0}'")]
    ArgsExpectedComma(char),
    #[error("duplicate macro parameter \"{0}\"")]
    ArgsDuplicate(String),
    #[error("'{0}' cannot appear at either end of a macro body")]
    HashOnEdge(&'static str),
    #[error("'{0}' is not followed by a macro parameter")]
    HashNotFollowed(&'static str),
    #[error("stray '{0}' in program")]
    CharacterStray(char),
}

/// Preprocessor warning kinds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    #[error("#line directive is skipped")]
    DirectiveLineSkipped,
    #[error("extra tokens at end of #{0} directive")]
    DirectiveExtraTokens(String),
    #[error("\"{0}\" is not defined, #set behaves as #define")]
    MacroNameUndefined(String),
}

/// Diagnostic severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message bound to a source location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: SourceLocation,
}

impl Diagnostic {
    pub fn error(message: String, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Error,
            message,
            location,
        }
    }

    pub fn warning(message: String, location: SourceLocation) -> Self {
        Self {
            severity: Severity::Warning,
            message,
            location,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.severity, self.message)
    }
}

/// Collects diagnostics across a run
pub struct DiagnosticReporter {
    diagnostics: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticReporter {
    pub fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
            error_count: 0,
            warning_count: 0,
        }
    }

    pub fn error(&mut self, kind: ErrorKind, location: SourceLocation) {
        self.diagnostics
            .push(Diagnostic::error(kind.to_string(), location));
        self.error_count += 1;
    }

    pub fn warning(&mut self, kind: WarningKind, location: SourceLocation) {
        self.diagnostics
            .push(Diagnostic::warning(kind.to_string(), location));
        self.warning_count += 1;
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Print all diagnostics to stderr
    pub fn print_diagnostics(&self) {
        for diagnostic in &self.diagnostics {
            eprintln!("{}", diagnostic);
        }
    }

    pub fn summary(&self) -> String {
        match (self.error_count, self.warning_count) {
            (0, 0) => "no errors or warnings".to_string(),
            (0, w) => format!("{} warning{}", w, if w == 1 { "" } else { "s" }),
            (e, 0) => format!("{} error{}", e, if e == 1 { "" } else { "s" }),
            (e, w) => format!(
                "{} error{} and {} warning{}",
                e,
                if e == 1 { "" } else { "s" },
                w,
                if w == 1 { "" } else { "s" }
            ),
        }
    }
}

impl Default for DiagnosticReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error(
            ErrorKind::MacroNameRedefine("MAX".to_string()).to_string(),
            SourceLocation::new("test.c", 3, 9),
        );
        assert_eq!(format!("{}", diag), "test.c:3:9: error: \"MAX\" redefined");
    }

    #[test]
    fn test_reporter_counts() {
        let mut reporter = DiagnosticReporter::new();
        assert!(!reporter.has_errors());

        reporter.error(ErrorKind::CallDepth, SourceLocation::unknown());
        reporter.warning(
            WarningKind::DirectiveLineSkipped,
            SourceLocation::unknown(),
        );

        assert!(reporter.has_errors());
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.warning_count(), 1);
    }

    #[test]
    fn test_summary() {
        let mut reporter = DiagnosticReporter::new();
        assert_eq!(reporter.summary(), "no errors or warnings");

        reporter.error(ErrorKind::CallDepth, SourceLocation::unknown());
        assert_eq!(reporter.summary(), "1 error");

        reporter.error(ErrorKind::IncludeDepth, SourceLocation::unknown());
        reporter.warning(
            WarningKind::DirectiveLineSkipped,
            SourceLocation::unknown(),
        );
        assert_eq!(reporter.summary(), "2 errors and 1 warning");
    }
}
