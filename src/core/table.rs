//! The signature table.
//!
//! Maps every symbol name a header declares, plus at most one canonical alias
//! per declaration, to its signature. Keys are write-once: when two headers
//! (or two declarations in one header) register the same key, the first one
//! wins and later ones are dropped without a diagnostic. Table contents
//! therefore depend on header order, which callers must keep fixed.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::signature::Signature;

/// How a table key relates to the declaration it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// The declared name itself
    Literal,
    /// Declared name with its context suffix removed
    Stem,
    /// Declared name with its version token removed
    Version,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Literal => write!(f, "literal"),
            KeyKind::Stem => write!(f, "stem"),
            KeyKind::Version => write!(f, "version"),
        }
    }
}

/// One key registration produced by signature extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub key: String,
    pub kind: KeyKind,
    pub signature: Signature,
}

/// A table entry with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct TableEntry {
    /// Lookup key
    pub key: String,
    /// Relationship between `key` and `signature.name`
    pub kind: KeyKind,
    /// Header the signature was declared in
    pub source: PathBuf,
    /// The registered signature
    pub signature: Signature,
}

/// Write-once mapping from symbol name to signature.
///
/// Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct SignatureTable {
    entries: Vec<TableEntry>,
    index: HashMap<String, usize>,
}

impl SignatureTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key` unless it is already present.
    ///
    /// Returns `true` if the entry was added. An existing entry is never
    /// overwritten.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        kind: KeyKind,
        signature: Signature,
        source: &Path,
    ) -> bool {
        let key = key.into();
        if self.index.contains_key(&key) {
            return false;
        }

        self.index.insert(key.clone(), self.entries.len());
        self.entries.push(TableEntry {
            key,
            kind,
            source: source.to_path_buf(),
            signature,
        });
        true
    }

    /// Look up a signature by key.
    pub fn get(&self, key: &str) -> Option<&Signature> {
        self.entry(key).map(|e| &e.signature)
    }

    /// Look up an entry by key.
    pub fn entry(&self, key: &str) -> Option<&TableEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &TableEntry> {
        self.entries.iter()
    }
}

/// Accumulates registrations from headers processed in a fixed order.
#[derive(Debug, Default)]
pub struct TableBuilder {
    table: SignatureTable,
    headers: usize,
    discarded: usize,
}

impl TableBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the registrations of one header, in declaration order.
    pub fn add_header(&mut self, source: &Path, registrations: Vec<Registration>) {
        let before = self.table.len();
        let total = registrations.len();

        for reg in registrations {
            if !self.table.insert(reg.key, reg.kind, reg.signature, source) {
                self.discarded += 1;
            }
        }

        self.headers += 1;
        tracing::debug!(
            "{}: {} keys added ({} registrations)",
            source.display(),
            self.table.len() - before,
            total
        );
    }

    /// Number of registrations dropped because their key already existed.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Finish building.
    pub fn build(self) -> SignatureTable {
        tracing::debug!(
            "signature table: {} keys from {} headers",
            self.table.len(),
            self.headers
        );
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(key: &str, kind: KeyKind, sig: &Signature) -> Registration {
        Registration {
            key: key.to_string(),
            kind,
            signature: sig.clone(),
        }
    }

    #[test]
    fn test_insert_is_write_once() {
        let mut table = SignatureTable::new();
        let first = Signature::new("cuFoo", "int").with_param("x", "int");
        let second = Signature::new("cuFoo", "float").with_param("y", "float");

        assert!(table.insert("cuFoo", KeyKind::Literal, first.clone(), Path::new("a.h")));
        assert!(!table.insert("cuFoo", KeyKind::Literal, second, Path::new("b.h")));

        assert_eq!(table.len(), 1);
        assert_eq!(table.get("cuFoo"), Some(&first));
        assert_eq!(table.entry("cuFoo").unwrap().source, PathBuf::from("a.h"));
    }

    #[test]
    fn test_first_header_wins() {
        let h1 = Signature::new("cuFoo", "int").with_param("x", "int");
        let h2 = Signature::new("cuFoo", "void").with_param("p", "void *");

        for _ in 0..3 {
            let mut builder = TableBuilder::new();
            builder.add_header(Path::new("h1.h"), vec![reg("cuFoo", KeyKind::Literal, &h1)]);
            builder.add_header(Path::new("h2.h"), vec![reg("cuFoo", KeyKind::Literal, &h2)]);
            assert_eq!(builder.discarded(), 1);

            let table = builder.build();
            assert_eq!(table.get("cuFoo"), Some(&h1));
        }
    }

    #[test]
    fn test_alias_does_not_displace_literal() {
        let literal = Signature::new("cuCtxCreate", "CUresult");
        let versioned = Signature::new("cuCtxCreate_v2", "CUresult").with_param("pctx", "CUcontext *");

        let mut builder = TableBuilder::new();
        builder.add_header(
            Path::new("cuda.h"),
            vec![
                reg("cuCtxCreate", KeyKind::Literal, &literal),
                reg("cuCtxCreate_v2", KeyKind::Literal, &versioned),
                reg("cuCtxCreate", KeyKind::Version, &versioned),
            ],
        );
        let table = builder.build();

        assert_eq!(table.len(), 2);
        assert_eq!(table.entry("cuCtxCreate").unwrap().kind, KeyKind::Literal);
        assert_eq!(table.get("cuCtxCreate"), Some(&literal));
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let mut table = SignatureTable::new();
        for name in ["cuB", "cuA", "cuC"] {
            table.insert(name, KeyKind::Literal, Signature::new(name, "int"), Path::new("x.h"));
        }
        let keys: Vec<_> = table.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["cuB", "cuA", "cuC"]);
    }
}
