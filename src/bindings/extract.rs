//! Signature extraction.
//!
//! Walks parsed headers and turns every prefixed function declaration into a
//! [`Signature`] registered under its literal name and at most one alias.
//! Headers are parsed in order with the macros of the previous ones in
//! effect, so a rename such as `#define cuGraphInstantiate
//! cuGraphInstantiateWithFlags` applies to every later declaration.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::macros::MacroTable;
use super::parser::DeclarationParser;
use super::types::{FunctionDecl, TranslationUnit};
use crate::core::canonical::Canonicalizer;
use crate::core::signature::{Param, Signature};
use crate::core::table::{KeyKind, Registration, SignatureTable, TableBuilder};

/// Extracts API signatures from parse trees.
#[derive(Debug, Clone)]
pub struct SignatureExtractor {
    prefix: String,
    canon: Canonicalizer,
}

impl SignatureExtractor {
    /// Create an extractor for functions whose names start with `prefix`.
    pub fn new(prefix: impl Into<String>, canon: Canonicalizer) -> Self {
        SignatureExtractor {
            prefix: prefix.into(),
            canon,
        }
    }

    /// Signatures of every prefixed function in declaration order.
    pub fn signatures(&self, unit: &TranslationUnit) -> Vec<Signature> {
        unit.functions()
            .filter(|f| f.spelling.starts_with(&self.prefix))
            .map(to_signature)
            .collect()
    }

    /// Table registrations for every prefixed function in declaration order.
    pub fn registrations(&self, unit: &TranslationUnit) -> Vec<Registration> {
        self.signatures(unit)
            .into_iter()
            .flat_map(|sig| self.register(sig))
            .collect()
    }

    /// Keys under which one declaration is registered.
    ///
    /// The literal name always comes first. A context-suffixed name adds its
    /// stem; otherwise a versioned name adds its version form. Never both.
    pub fn register(&self, signature: Signature) -> Vec<Registration> {
        let literal = signature.name.clone();
        let stem = self.canon.stem_form(&literal);

        let alias = if stem != literal {
            Some((stem.to_string(), KeyKind::Stem))
        } else {
            let version = self.canon.version_form(&literal);
            (version != literal).then(|| (version.to_string(), KeyKind::Version))
        };

        let mut regs = vec![Registration {
            key: literal,
            kind: KeyKind::Literal,
            signature: signature.clone(),
        }];
        if let Some((key, kind)) = alias {
            regs.push(Registration {
                key,
                kind,
                signature,
            });
        }
        regs
    }

    /// Object-like macros that rename a prefixed identifier.
    ///
    /// Headers write `#define cuCtxCreate cuCtxCreate_v2`, or wrap the target
    /// in a helper macro, so that source code binds to another entry point.
    /// Generated code defining `cuCtxCreate` itself must `#undef` these
    /// first. A body naming any prefixed identifier qualifies, except a body
    /// that is exactly the macro's own name.
    pub fn aliasing_macros(&self, unit: &TranslationUnit) -> Vec<String> {
        unit.macros
            .iter()
            .filter(|m| m.is_object_like() && m.name.starts_with(&self.prefix))
            .filter(|m| m.body != m.name)
            .filter(|m| {
                m.body
                    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                    .any(|word| word.starts_with(&self.prefix))
            })
            .map(|m| m.name.clone())
            .collect()
    }
}

fn to_signature(func: &FunctionDecl) -> Signature {
    Signature {
        name: func.spelling.clone(),
        return_type: func.result_type.clone(),
        params: func
            .arguments
            .iter()
            .map(|a| Param::new(&a.spelling, &a.type_spelling))
            .collect(),
        variadic: func.variadic,
    }
}

/// Everything extracted from the configured headers.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Signature table, first declaration wins
    pub table: SignatureTable,

    /// Aliasing macros in header order, without duplicates
    pub aliasing_macros: Vec<String>,

    /// Registrations dropped because their key already existed
    pub discarded: usize,
}

/// Parse `headers` in order and build the signature table.
///
/// Each header starts with the macros the previous one left defined, the
/// way an API header's renames apply to the headers that include it. Any
/// header that fails to parse aborts the whole extraction.
pub fn extract_headers(
    parser: &dyn DeclarationParser,
    extractor: &SignatureExtractor,
    headers: &[PathBuf],
) -> Result<Extraction> {
    let mut builder = TableBuilder::new();
    let mut aliasing_macros = Vec::new();
    let mut seen = HashSet::new();
    let mut macros = MacroTable::new();

    for header in headers {
        let unit = parser
            .parse_file(header, &macros)
            .with_context(|| format!("failed to extract signatures from {}", header.display()))?;

        macros = MacroTable::from_unit(&unit);
        builder.add_header(header, extractor.registrations(&unit));

        for name in extractor.aliasing_macros(&unit) {
            if seen.insert(name.clone()) {
                aliasing_macros.push(name);
            }
        }
    }

    let discarded = builder.discarded();
    Ok(Extraction {
        table: builder.build(),
        aliasing_macros,
        discarded,
    })
}
