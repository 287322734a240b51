//! Symbol name canonicalization.
//!
//! Versioned C APIs export several textual names for one ABI slot:
//! `cuMemcpyHtoDAsync`, `cuMemcpyHtoDAsync_v2` and `cuMemcpyHtoDAsync_v2_ptsz`
//! all take the same arguments. The two forms computed here let the
//! signature table and the resolver meet on a shared name.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Context suffixes used by the CUDA driver API for per-thread-stream variants.
pub const DEFAULT_CONTEXT_SUFFIXES: &[&str] = &["_ptsz", "_ptds"];

/// Marker introducing an API revision number (`_v2`, `_v3`, ...).
pub const DEFAULT_VERSION_MARKER: &str = "_v";

/// Name canonicalization rules for one API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Canonicalizer {
    /// Trailing tokens marking an ABI-identical context variant
    pub context_suffixes: Vec<String>,

    /// Token that, followed by decimal digits, marks an API revision
    pub version_marker: String,
}

impl Default for Canonicalizer {
    fn default() -> Self {
        Canonicalizer {
            context_suffixes: DEFAULT_CONTEXT_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            version_marker: DEFAULT_VERSION_MARKER.to_string(),
        }
    }
}

impl Canonicalizer {
    /// Create a canonicalizer with the CUDA driver API conventions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the context suffixes.
    pub fn with_context_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.context_suffixes = suffixes;
        self
    }

    /// Set the version marker.
    pub fn with_version_marker(mut self, marker: impl Into<String>) -> Self {
        self.version_marker = marker.into();
        self
    }

    /// Strip trailing context suffixes.
    ///
    /// `cuMemAllocAsync_ptsz` becomes `cuMemAllocAsync`. Names without a
    /// context suffix are returned unchanged. Suffixes are removed until none
    /// is left, so the result is always a fixpoint.
    pub fn stem_form<'a>(&self, name: &'a str) -> &'a str {
        let mut current = name;
        loop {
            let stripped = self
                .context_suffixes
                .iter()
                .filter(|suffix| !suffix.is_empty())
                .find_map(|suffix| current.strip_suffix(suffix.as_str()));

            match stripped {
                Some(rest) => current = rest,
                None => return current,
            }
        }
    }

    /// Drop an API revision and everything after it.
    ///
    /// `cuMemcpyHtoDAsync_v2_ptsz` becomes `cuMemcpyHtoDAsync`. The name is cut
    /// at the first version marker followed by at least one digit. When no
    /// such marker exists this is [`Canonicalizer::stem_form`].
    pub fn version_form<'a>(&self, name: &'a str) -> &'a str {
        match self.find_version_token(name) {
            Some(start) => self.stem_form(&name[..start]),
            None => self.stem_form(name),
        }
    }

    /// Byte offset of the first `<marker><digits>` occurrence.
    fn find_version_token(&self, name: &str) -> Option<usize> {
        let marker = self.version_marker.as_str();
        if marker.is_empty() {
            return None;
        }

        name.match_indices(marker)
            .map(|(start, _)| start)
            .find(|&start| {
                name[start + marker.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_ascii_digit())
            })
    }
}

/// Rules used by the free functions below.
static DEFAULT_RULES: LazyLock<Canonicalizer> = LazyLock::new(Canonicalizer::default);

/// [`Canonicalizer::stem_form`] with the default conventions.
pub fn stem_form(name: &str) -> &str {
    DEFAULT_RULES.stem_form(name)
}

/// [`Canonicalizer::version_form`] with the default conventions.
pub fn version_form(name: &str) -> &str {
    DEFAULT_RULES.version_form(name)
}
