//! Test utilities and mocks for hookgen unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use hookgen::test_support::{write_headers, MockSymbolSource};
//!
//! #[test]
//! fn test_example() {
//!     let (_tmp, headers) = write_headers(&[("cuda.h", "CUresult cuInit(unsigned int);")]);
//!     let symbols = MockSymbolSource::new(["cuInit"]);
//!     // Use fixtures in tests...
//! }
//! ```

pub mod fixtures;

use std::path::PathBuf;

use anyhow::{bail, Result};
use tempfile::TempDir;

use crate::sources::SymbolSource;

// Re-export fixtures for convenience
pub use fixtures::*;

/// Write header files into a fresh temporary directory.
///
/// Returns the directory guard and the header paths in the given order.
pub fn write_headers(headers: &[(&str, &str)]) -> (TempDir, Vec<PathBuf>) {
    let tmp = TempDir::new().expect("failed to create temp dir");
    let paths = headers
        .iter()
        .map(|(name, content)| {
            let path = tmp.path().join(name);
            std::fs::write(&path, content).expect("failed to write header");
            path
        })
        .collect();
    (tmp, paths)
}

/// In-memory symbol source.
#[derive(Debug, Clone, Default)]
pub struct MockSymbolSource {
    symbols: Vec<String>,
    failure: Option<String>,
}

impl MockSymbolSource {
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MockSymbolSource {
            symbols: symbols.into_iter().map(Into::into).collect(),
            failure: None,
        }
    }

    /// A source whose `read` always fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        MockSymbolSource {
            symbols: Vec::new(),
            failure: Some(message.into()),
        }
    }
}

impl SymbolSource for MockSymbolSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn read(&self) -> Result<Vec<String>> {
        if let Some(ref message) = self.failure {
            bail!("{}", message);
        }
        Ok(self.symbols.clone())
    }
}
