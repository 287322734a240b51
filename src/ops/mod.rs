//! High-level operations.
//!
//! This module contains the implementation of hookgen commands.

pub mod generate;

pub use generate::{
    emit_context, extract, generate, render_hooks, symbol_source, GenerateOptions, GenerateReport,
};
