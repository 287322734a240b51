//! Exported-symbol sources.
//!
//! A [`SymbolSource`] lists the dynamic symbols a shared library exports.
//! The list drives generation: one trampoline per exported name.

pub mod symbols;

pub use symbols::{
    exported_symbols, matches_prefix, ListSymbolReader, NmSymbolReader, ObjectSymbolReader,
    SymbolSource,
};
