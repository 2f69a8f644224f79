//! Shared infrastructure for the mcc compiler
//!
//! This crate holds the pieces every phase needs: source locations for
//! error reporting and the diagnostic types the preprocessor and the code
//! generator log against.

pub mod error;
pub mod source_loc;

pub use error::{Diagnostic, DiagnosticReporter, ErrorKind, Severity, WarningKind};
pub use source_loc::SourceLocation;
