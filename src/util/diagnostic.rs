//! User-facing diagnostics.
//!
//! Two kinds of problems are reported. Fatal setup errors (an unparseable
//! header, an unreadable symbol table) abort the run and are plain error
//! types. Per-symbol problems (an exported symbol without a declaration) are
//! [`Diagnostic`] values: collected, printed, and the run carries on.

use std::fmt;
use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Common suggestion messages.
pub mod suggestions {
    /// Suggestion when an exported symbol has no declaration.
    pub const UNDECLARED_SYMBOL: &str =
        "add the header declaring it to `target.headers`, or ignore it if the symbol is internal";

    /// Suggestion when a variadic function is exported.
    pub const VARIADIC_SYMBOL: &str =
        "variadic functions cannot be forwarded; write this trampoline by hand";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Note,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Symbol the diagnostic is about
    pub symbol: Option<String>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    fn with_severity(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity,
            symbol: None,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, message)
    }

    /// Create a new note.
    pub fn note(message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Note, message)
    }

    /// Attach the symbol this diagnostic is about.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
                Severity::Note => "\x1b[1;36mnote\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
                Severity::Note => "note",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            for suggestion in &self.suggestions {
                output.push_str(&format!("  {}: {}\n", help_prefix, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// A header could not be parsed.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to parse header `{}`: {reason}", .path.display())]
#[diagnostic(
    code(hookgen::header::parse),
    help("the header must be a single flat C translation unit")
)]
pub struct HeaderParseError {
    pub path: PathBuf,
    pub reason: String,
    #[source_code]
    pub src: Option<NamedSource<String>>,
    #[label("here")]
    pub span: Option<SourceSpan>,
}

impl HeaderParseError {
    /// An error without a source location.
    pub fn new(path: &Path, reason: impl Into<String>) -> Self {
        HeaderParseError {
            path: path.to_path_buf(),
            reason: reason.into(),
            src: None,
            span: None,
        }
    }

    /// An error pointing at `len` bytes from `offset` in `content`.
    pub fn at(
        path: &Path,
        content: &str,
        offset: usize,
        len: usize,
        reason: impl Into<String>,
    ) -> Self {
        HeaderParseError {
            path: path.to_path_buf(),
            reason: reason.into(),
            src: Some(NamedSource::new(
                path.display().to_string(),
                content.to_string(),
            )),
            span: Some((offset, len).into()),
        }
    }

    /// Byte offset of the error, when known.
    pub fn offset(&self) -> Option<usize> {
        self.span.map(|s| s.offset())
    }
}

/// The exported symbols of a library could not be listed.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("failed to read exported symbols from `{}`: {reason}", .library.display())]
#[diagnostic(code(hookgen::symbols::read), help("set `symbols.reader = \"object\"` to read the library without `nm`"))]
pub struct SymbolReadError {
    pub library: PathBuf,
    pub reason: String,
}

impl SymbolReadError {
    pub fn new(library: &Path, reason: impl Into<String>) -> Self {
        SymbolReadError {
            library: library.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

/// Render a miette diagnostic with source snippets.
pub fn render_report(diagnostic: &dyn MietteDiagnostic, color: bool) -> String {
    let theme = if color {
        miette::GraphicalTheme::unicode()
    } else {
        miette::GraphicalTheme::unicode_nocolor()
    };
    let mut out = String::new();
    match miette::GraphicalReportHandler::new_themed(theme).render_report(&mut out, diagnostic) {
        Ok(()) => out,
        Err(_) => diagnostic.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::warning("no declaration found for `cuInternalThing`")
            .with_symbol("cuInternalThing")
            .with_context("tried `cuInternalThing`, `cuInternalThing`, `cuInternalThing`")
            .with_suggestion(suggestions::UNDECLARED_SYMBOL);

        let output = diag.format(false);
        assert!(output.starts_with("warning: no declaration found for `cuInternalThing`"));
        assert!(output.contains("  = tried"));
        assert!(output.contains("help: add the header"));
        assert_eq!(diag.symbol.as_deref(), Some("cuInternalThing"));
    }

    #[test]
    fn test_colored_formatting() {
        let output = Diagnostic::error("boom").format(true);
        assert!(output.contains("\x1b[1;31merror\x1b[0m: boom"));
    }

    #[test]
    fn test_header_parse_error_display() {
        let err = HeaderParseError::at(Path::new("cuda.h"), "int x(;", 5, 1, "unclosed '('");
        assert_eq!(err.to_string(), "failed to parse header `cuda.h`: unclosed '('");
        assert_eq!(err.offset(), Some(5));

        let report = render_report(&err, false);
        assert!(report.contains("cuda.h"));
        assert!(report.contains("here"));
    }

    #[test]
    fn test_symbol_read_error_display() {
        let err = SymbolReadError::new(Path::new("/lib/libcuda.so"), "`nm` exited with 1");
        assert_eq!(
            err.to_string(),
            "failed to read exported symbols from `/lib/libcuda.so`: `nm` exited with 1"
        );
    }
}
