//! Trampoline rendering.
//!
//! A [`TrampolineBackend`] turns resolved signatures into source text in some
//! target language. [`render`] drives a backend over the resolutions of one
//! run and collects the diagnostics for symbols it had to skip.

pub mod cpp;

use std::path::PathBuf;

use crate::core::signature::Signature;
use crate::resolver::Resolution;
use crate::util::diagnostic::{suggestions, Diagnostic};

pub use cpp::CppBackend;

/// Settings shared by every trampoline of one generated file.
#[derive(Debug, Clone, Default)]
pub struct EmitContext {
    /// Library whose entry points the trampolines resolve at run time
    pub library: PathBuf,

    /// Headers to include, in order
    pub includes: Vec<String>,

    /// Macros to `#undef` before defining trampolines
    pub undefs: Vec<String>,

    /// Headers the signatures were extracted from
    pub headers: Vec<PathBuf>,

    /// Target triple the headers were read for
    pub triple: String,
}

/// A code generation backend for trampolines.
pub trait TrampolineBackend {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Fixed text preceding all trampolines.
    fn prelude(&self, ctx: &EmitContext) -> String;

    /// One trampoline named `exported` with the types of `signature`.
    fn trampoline(&self, exported: &str, signature: &Signature) -> String;
}

/// Result of rendering one file.
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    /// Complete file contents
    pub text: String,

    /// Number of trampolines emitted
    pub emitted: usize,

    /// Symbols skipped, one diagnostic each
    pub diagnostics: Vec<Diagnostic>,
}

/// Render the prelude and one trampoline per resolved symbol, in order.
pub fn render(
    backend: &dyn TrampolineBackend,
    ctx: &EmitContext,
    resolutions: &[Resolution<'_>],
) -> Rendered {
    let mut out = Rendered {
        text: backend.prelude(ctx),
        ..Default::default()
    };

    for resolution in resolutions {
        match resolution {
            Resolution::Resolved(resolved) if resolved.signature().variadic => {
                tracing::warn!("skipping variadic function `{}`", resolved.exported);
                out.diagnostics.push(
                    Diagnostic::warning(format!(
                        "`{}` not generated: variadic functions cannot be forwarded",
                        resolved.exported
                    ))
                    .with_symbol(resolved.exported.clone())
                    .with_location(resolved.entry.source.clone())
                    .with_context(format!("declared as {}", resolved.signature()))
                    .with_suggestion(suggestions::VARIADIC_SYMBOL),
                );
            }
            Resolution::Resolved(resolved) => {
                out.text
                    .push_str(&backend.trampoline(&resolved.exported, resolved.signature()));
                out.text.push('\n');
                out.emitted += 1;
            }
            Resolution::Unresolved { exported, .. } => {
                tracing::warn!("no declaration found for `{}`", exported);
                out.diagnostics.extend(resolution.diagnostic());
            }
        }
    }

    tracing::debug!(
        "{} backend: {} trampolines, {} skipped",
        backend.name(),
        out.emitted,
        out.diagnostics.len()
    );

    out
}
