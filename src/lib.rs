//! hookgen - interposition trampolines for versioned C APIs
//!
//! This crate reads the function declarations of a C API from its headers,
//! lists the symbols a shared library exports, matches every exported name
//! to a declared signature across the API's versioning conventions, and
//! renders forwarding trampolines that bind to the real library lazily.

pub mod bindings;
pub mod core;
pub mod emit;
pub mod ops;
pub mod resolver;
pub mod runtime;
pub mod sources;
pub mod util;

/// Test utilities and fixtures for hookgen unit tests.
#[cfg(test)]
pub mod test_support;

pub use core::{Canonicalizer, Signature, SignatureTable};
pub use resolver::{Resolution, SignatureResolver};
pub use util::config::HookConfig;
