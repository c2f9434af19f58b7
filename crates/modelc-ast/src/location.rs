//! Source location tagging, attached to every AST node and carried through
//! to every later IR node so diagnostics can always cite where a problem
//! came from (spec.md §6 "Diagnostics": file/line/column header).

use std::fmt;
use std::sync::Arc;

/// A position in a source file, identified by the file it came from.
///
/// `file` is an `Arc<str>` rather than a `String` because the same file
/// path is shared by every node parsed from it; cloning a location (which
/// happens constantly while threading it through resolution) should not
/// re-allocate the path each time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }

    /// A placeholder location for synthesized nodes (e.g. derived variables
    /// that have no single declaration site of their own). Diagnostics
    /// involving a synthesized node should prefer citing the originating
    /// declaration instead of this.
    pub fn synthesized() -> Self {
        SourceLocation {
            file: Arc::from("<synthesized>"),
            line: 0,
            column: 0,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
