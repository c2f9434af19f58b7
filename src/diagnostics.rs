//! The error taxonomy (spec.md §7) and the two reporting streams (§6,
//! "Diagnostics": error and log). Each pass-specific error type is a
//! `thiserror` enum, the same one-enum-per-subsystem split
//! uses across `src/schema/catalog.rs`, `src/storage/error.rs`, etc.;
//! `CompileError` unifies them behind the four-way taxonomy so the
//! top-level `Compiler` can report one consistent kind/location/message
//! triple regardless of which pass raised it.

use modelc_ast::SourceLocation;
use thiserror::Error;

/// The four-way error taxonomy from spec.md §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parsing,
    ModelBuilding,
    ApiUsage,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Parsing => "parsing",
            ErrorKind::ModelBuilding => "model_building",
            ErrorKind::ApiUsage => "api_usage",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{s}")
    }
}

/// A single reported failure, carrying its kind, the source location that
/// triggered it, a human message, and an optional dependency trace (for
/// cycle/conflict diagnostics — spec.md §7 "dependency trace").
#[derive(Debug, Clone, Error)]
#[error("{kind} error at {location}: {message}")]
pub struct CompileError {
    pub kind: ErrorKind,
    pub location: SourceLocation,
    pub message: String,
    pub trace: Vec<String>,
}

impl CompileError {
    pub fn new(kind: ErrorKind, location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError {
            kind,
            location,
            message: message.into(),
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    pub fn parsing(location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError::new(ErrorKind::Parsing, location, message)
    }

    pub fn model_building(location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError::new(ErrorKind::ModelBuilding, location, message)
    }

    pub fn api_usage(location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError::new(ErrorKind::ApiUsage, location, message)
    }

    pub fn internal(location: SourceLocation, message: impl Into<String>) -> Self {
        CompileError::new(ErrorKind::Internal, location, message)
    }
}

/// An informational message, distinct from `CompileError` — the "log"
/// half of the two diagnostic streams in spec.md §6. Not the same
/// channel as `tracing`'s operational spans: this is user-facing compile
/// feedback (e.g. "inlined function `f` 4 times"), collected so a caller
/// embedding the compiler can surface it verbatim.
#[derive(Debug, Clone)]
pub struct LogMessage {
    pub location: SourceLocation,
    pub message: String,
}

/// Accumulates both diagnostic streams for one compile invocation. The
/// compile aborts at the first error in a pass (spec.md §7 "no
/// partial-result recovery"); `log` entries are purely additive.
#[derive(Debug, Default)]
pub struct DiagnosticStream {
    logs: Vec<LogMessage>,
}

impl DiagnosticStream {
    pub fn new() -> Self {
        DiagnosticStream::default()
    }

    pub fn log(&mut self, location: SourceLocation, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(%location, %message, "compiler log");
        self.logs.push(LogMessage { location, message });
    }

    pub fn logs(&self) -> &[LogMessage] {
        &self.logs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_location() {
        let err = CompileError::model_building(SourceLocation::synthesized(), "units disagree");
        let text = err.to_string();
        assert!(text.contains("model_building"));
        assert!(text.contains("units disagree"));
    }

    #[test]
    fn diagnostic_stream_accumulates_logs() {
        let mut stream = DiagnosticStream::new();
        stream.log(SourceLocation::synthesized(), "inlined f");
        assert_eq!(stream.logs().len(), 1);
    }
}
