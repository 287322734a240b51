//! The resolution fallback chain.

use std::fmt;

use serde::Serialize;

use crate::core::canonical::Canonicalizer;
use crate::core::signature::Signature;
use crate::core::table::{SignatureTable, TableEntry};
use crate::util::diagnostic::{suggestions, Diagnostic};

/// Which lookup in the fallback chain produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// The exported name itself
    Exact,
    /// The exported name without its context suffix
    Stem,
    /// The exported name without its version token
    Version,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Exact => write!(f, "exact"),
            Tier::Stem => write!(f, "stem"),
            Tier::Version => write!(f, "version"),
        }
    }
}

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved<'t> {
    /// Name exported by the library; the trampoline is emitted under it
    pub exported: String,
    /// Table key that matched
    pub key: String,
    /// Lookup that matched
    pub tier: Tier,
    /// Matched table entry
    pub entry: &'t TableEntry,
}

impl Resolved<'_> {
    /// The signature whose types the trampoline copies.
    pub fn signature(&self) -> &Signature {
        &self.entry.signature
    }
}

/// Outcome of resolving one exported symbol.
#[derive(Debug, Clone)]
pub enum Resolution<'t> {
    Resolved(Resolved<'t>),
    Unresolved {
        exported: String,
        /// Keys looked up, in order
        tried: Vec<String>,
    },
}

impl<'t> Resolution<'t> {
    /// The exported name this resolution is about.
    pub fn exported(&self) -> &str {
        match self {
            Resolution::Resolved(r) => &r.exported,
            Resolution::Unresolved { exported, .. } => exported,
        }
    }

    /// The resolved entry, if any.
    pub fn resolved(&self) -> Option<&Resolved<'t>> {
        match self {
            Resolution::Resolved(r) => Some(r),
            Resolution::Unresolved { .. } => None,
        }
    }

    /// Diagnostic for a miss.
    pub fn diagnostic(&self) -> Option<Diagnostic> {
        match self {
            Resolution::Resolved(_) => None,
            Resolution::Unresolved { exported, tried } => Some(
                Diagnostic::warning(format!(
                    "`{}` not generated: no declaration found in headers",
                    exported
                ))
                .with_symbol(exported.clone())
                .with_context(format!("looked up {}", quote_list(tried)))
                .with_suggestion(suggestions::UNDECLARED_SYMBOL),
            ),
        }
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("`{}`", i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves exported names against a signature table.
#[derive(Debug, Clone, Copy)]
pub struct SignatureResolver<'t> {
    table: &'t SignatureTable,
    canon: &'t Canonicalizer,
}

impl<'t> SignatureResolver<'t> {
    /// Create a resolver over `table`.
    pub fn new(table: &'t SignatureTable, canon: &'t Canonicalizer) -> Self {
        SignatureResolver { table, canon }
    }

    /// Resolve one exported name.
    ///
    /// Tries the exact name, then its stem form, then its version form, and
    /// stops at the first key present in the table.
    pub fn resolve(&self, exported: &str) -> Resolution<'t> {
        let candidates = [
            (exported, Tier::Exact),
            (self.canon.stem_form(exported), Tier::Stem),
            (self.canon.version_form(exported), Tier::Version),
        ];

        for (key, tier) in candidates {
            if let Some(entry) = self.table.entry(key) {
                tracing::trace!("{} -> {} ({})", exported, key, tier);
                return Resolution::Resolved(Resolved {
                    exported: exported.to_string(),
                    key: key.to_string(),
                    tier,
                    entry,
                });
            }
        }

        let mut tried: Vec<String> = Vec::with_capacity(3);
        for (key, _) in candidates {
            if !tried.iter().any(|t| t == key) {
                tried.push(key.to_string());
            }
        }

        Resolution::Unresolved {
            exported: exported.to_string(),
            tried,
        }
    }

    /// Resolve every exported name, preserving order and duplicates.
    pub fn resolve_all<S: AsRef<str>>(&self, exported: &[S]) -> Vec<Resolution<'t>> {
        exported.iter().map(|e| self.resolve(e.as_ref())).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::table::KeyKind;

    fn table(entries: &[(&str, KeyKind, Signature)]) -> SignatureTable {
        let mut table = SignatureTable::new();
        for (key, kind, sig) in entries {
            table.insert(*key, *kind, sig.clone(), Path::new("cuda.h"));
        }
        table
    }

    fn resolved<'a>(res: &'a Resolution<'_>) -> &'a Resolved<'a> {
        res.resolved().expect("expected a resolution")
    }

    #[test]
    fn test_exact_match_wins_over_aliases() {
        let exact = Signature::new("cuCtxCreate_v2", "CUresult").with_param("pctx", "CUcontext *");
        let other = Signature::new("cuCtxCreate_v2_ptsz", "CUresult");
        let table = table(&[
            ("cuCtxCreate_v2", KeyKind::Stem, other.clone()),
            ("cuCtxCreate_v2_ptsz", KeyKind::Literal, other),
            ("cuCtxCreate", KeyKind::Version, exact.clone()),
        ]);
        let canon = Canonicalizer::new();
        let resolver = SignatureResolver::new(&table, &canon);

        let res = resolver.resolve("cuCtxCreate_v2_ptsz");
        assert_eq!(resolved(&res).tier, Tier::Exact);
        assert_eq!(resolved(&res).key, "cuCtxCreate_v2_ptsz");
    }

    #[test]
    fn test_stem_fallback() {
        let sig = Signature::new("cuMemAllocAsync", "CUresult");
        let table = table(&[("cuMemAllocAsync", KeyKind::Literal, sig.clone())]);
        let canon = Canonicalizer::new();

        let res = SignatureResolver::new(&table, &canon).resolve("cuMemAllocAsync_ptsz");
        let r = resolved(&res);
        assert_eq!(r.tier, Tier::Stem);
        assert_eq!(r.exported, "cuMemAllocAsync_ptsz");
        assert_eq!(r.signature(), &sig);
    }

    #[test]
    fn test_stem_is_tried_before_version() {
        let stem = Signature::new("cuMemcpyHtoDAsync_v2", "CUresult").with_param("a", "int");
        let base = Signature::new("cuMemcpyHtoDAsync", "CUresult").with_param("b", "float");
        let table = table(&[
            ("cuMemcpyHtoDAsync", KeyKind::Literal, base),
            ("cuMemcpyHtoDAsync_v2", KeyKind::Literal, stem.clone()),
        ]);
        let canon = Canonicalizer::new();

        let res = SignatureResolver::new(&table, &canon).resolve("cuMemcpyHtoDAsync_v2_ptsz");
        assert_eq!(resolved(&res).tier, Tier::Stem);
        assert_eq!(resolved(&res).signature(), &stem);
    }

    #[test]
    fn test_version_fallback() {
        let base = Signature::new("cuMemcpyHtoDAsync", "CUresult");
        let table = table(&[("cuMemcpyHtoDAsync", KeyKind::Literal, base)]);
        let canon = Canonicalizer::new();
        let resolver = SignatureResolver::new(&table, &canon);

        for name in ["cuMemcpyHtoDAsync_v2", "cuMemcpyHtoDAsync_v2_ptsz", "cuMemcpyHtoDAsync_v3"] {
            let res = resolver.resolve(name);
            assert_eq!(resolved(&res).tier, Tier::Version, "{name}");
            assert_eq!(resolved(&res).exported, name);
        }
    }

    #[test]
    fn test_miss_produces_diagnostic() {
        let table = SignatureTable::new();
        let canon = Canonicalizer::new();

        let res = SignatureResolver::new(&table, &canon).resolve("cuBar_v2_ptsz");
        assert!(res.resolved().is_none());
        assert_eq!(res.exported(), "cuBar_v2_ptsz");

        let diag = res.diagnostic().unwrap();
        assert_eq!(diag.symbol.as_deref(), Some("cuBar_v2_ptsz"));
        assert!(diag.context[0].contains("`cuBar_v2_ptsz`, `cuBar_v2`, `cuBar`"));
    }

    #[test]
    fn test_resolve_all_keeps_order_and_duplicates() {
        let table = table(&[("cuFoo", KeyKind::Literal, Signature::new("cuFoo", "int"))]);
        let canon = Canonicalizer::new();

        let results =
            SignatureResolver::new(&table, &canon).resolve_all(&["cuFoo", "cuBar", "cuFoo"]);
        let names: Vec<_> = results.iter().map(|r| r.exported()).collect();
        assert_eq!(names, ["cuFoo", "cuBar", "cuFoo"]);
        assert!(results[0].resolved().is_some());
        assert!(results[1].resolved().is_none());
        assert!(results[2].resolved().is_some());
    }
}
