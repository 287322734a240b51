//! Core data structures for hookgen.
//!
//! - Symbol name canonicalization
//! - Declared signatures
//! - The write-once signature table

pub mod canonical;
pub mod signature;
pub mod table;

pub use canonical::{stem_form, version_form, Canonicalizer};
pub use signature::{Param, Signature};
pub use table::{KeyKind, SignatureTable, TableBuilder, TableEntry};
