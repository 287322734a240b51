//! Exported symbol resolution.
//!
//! Maps each name exported by the target library to a declared signature
//! through a fixed fallback chain: exact name, stem form, version form.

pub mod resolve;

pub use resolve::{Resolution, Resolved, SignatureResolver, Tier};
