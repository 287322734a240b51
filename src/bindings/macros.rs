//! Macro renames of function declarators.
//!
//! API headers redirect source-level names to versioned entry points with
//! `#define cuCtxCreate cuCtxCreate_v2`, or through a helper such as
//! `#define cuMemcpy __CUDA_API_PTDS(cuMemcpy)`. A C front end sees the
//! expanded name, so a declaration written `cuCtxCreate(...)` declares
//! `cuCtxCreate_v2`. [`MacroTable`] tracks the definitions in effect and
//! performs that expansion for declarator names only.

use std::collections::{HashMap, HashSet};

use super::parser::is_identifier;
use super::types::{MacroDef, TranslationUnit};

/// Expansion chains longer than this are left alone.
const MAX_EXPANSION_DEPTH: usize = 16;

/// Macros in effect at some point of a header sequence, in definition order.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: Vec<MacroDef>,
    index: HashMap<String, usize>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Macros in effect at the end of a parsed header.
    pub fn from_unit(unit: &TranslationUnit) -> Self {
        let mut table = Self::new();
        for def in &unit.macros {
            table.define(def.clone());
        }
        table
    }

    /// Apply a `#define`; a redefinition moves the macro to the end.
    pub fn define(&mut self, def: MacroDef) {
        self.undefine(&def.name);
        self.index.insert(def.name.clone(), self.defs.len());
        self.defs.push(def);
    }

    /// Apply an `#undef`.
    pub fn undefine(&mut self, name: &str) {
        if let Some(pos) = self.index.remove(name) {
            self.defs.remove(pos);
            for slot in self.index.values_mut() {
                if *slot > pos {
                    *slot -= 1;
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.index.get(name).map(|&i| &self.defs[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Definitions in order.
    pub fn iter(&self) -> impl Iterator<Item = &MacroDef> {
        self.defs.iter()
    }

    pub fn into_defs(self) -> Vec<MacroDef> {
        self.defs
    }

    /// The name a function declarator spelled `name` actually declares.
    ///
    /// Returns `name` unchanged unless it is an object-like macro whose
    /// expansion is a single identifier. A macro is not re-expanded inside
    /// its own expansion.
    pub fn expand_name(&self, name: &str) -> String {
        let mut current = name.to_string();
        let mut seen = HashSet::new();

        for _ in 0..MAX_EXPANSION_DEPTH {
            let Some(def) = self.get(&current).filter(|d| d.is_object_like()) else {
                break;
            };
            if !seen.insert(current.clone()) {
                break;
            }
            let Some(next) = self.expand_identifier(&def.body, &mut seen) else {
                return name.to_string();
            };
            if next == current {
                break;
            }
            current = next;
        }

        current
    }

    /// Expand a macro body to a single identifier, if it reduces to one.
    fn expand_identifier(&self, body: &str, seen: &mut HashSet<String>) -> Option<String> {
        let tokens = lex(body);
        match tokens.as_slice() {
            [ident] if is_identifier(ident) => Some(ident.clone()),
            [callee, open, args @ .., close] if open == "(" && close == ")" => {
                let def = self.get(callee)?;
                let params = def.params.as_ref()?;
                if seen.contains(callee) {
                    return None;
                }
                let args = split_args(args);
                if args.len() != params.len() {
                    return None;
                }

                let substituted: Vec<String> = lex(&def.body)
                    .into_iter()
                    .flat_map(|tok| match params.iter().position(|p| *p == tok) {
                        Some(i) => args[i].clone(),
                        None => vec![tok],
                    })
                    .collect();

                match paste(substituted).as_slice() {
                    [ident] if is_identifier(ident) => {
                        seen.insert(callee.clone());
                        Some(ident.clone())
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

/// Split a macro body into identifiers, numbers, `##` and single punctuators.
fn lex(body: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_whitespace() {
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            let mut word = String::from(c);
            while let Some(&next) = chars.peek() {
                if !(next.is_alphanumeric() || next == '_') {
                    break;
                }
                word.push(next);
                chars.next();
            }
            tokens.push(word);
        } else if c == '#' && chars.peek() == Some(&'#') {
            chars.next();
            tokens.push("##".to_string());
        } else {
            tokens.push(c.to_string());
        }
    }
    tokens
}

/// Split call arguments at top-level commas.
fn split_args(tokens: &[String]) -> Vec<Vec<String>> {
    let mut args = vec![Vec::new()];
    let mut depth = 0usize;
    for tok in tokens {
        match tok.as_str() {
            "(" => depth += 1,
            ")" => depth = depth.saturating_sub(1),
            "," if depth == 0 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        if let Some(last) = args.last_mut() {
            last.push(tok.clone());
        }
    }
    if args.len() == 1 && args[0].is_empty() {
        args.clear();
    }
    args
}

/// Apply `##` token pasting.
fn paste(tokens: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut glue = false;
    for tok in tokens {
        if tok == "##" {
            glue = true;
            continue;
        }
        match out.last_mut() {
            Some(last) if glue => last.push_str(&tok),
            _ => out.push(tok),
        }
        glue = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(defs: Vec<MacroDef>) -> MacroTable {
        MacroTable::from_unit(&TranslationUnit {
            macros: defs,
            ..TranslationUnit::new("cuda.h")
        })
    }

    #[test]
    fn test_define_and_undefine_keep_order() {
        let mut macros = MacroTable::new();
        macros.define(MacroDef::object("cuA", "cuA_v2"));
        macros.define(MacroDef::object("cuB", "cuB_v2"));
        macros.define(MacroDef::object("cuC", "cuC_v2"));
        macros.define(MacroDef::object("cuA", "cuA_v3"));
        macros.undefine("cuB");
        macros.undefine("cuMissing");

        let names: Vec<_> = macros.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["cuC", "cuA"]);
        assert_eq!(macros.get("cuA").unwrap().body, "cuA_v3");
        assert!(!macros.contains("cuB"));
        assert_eq!(macros.expand_name("cuC"), "cuC_v2");
    }

    #[test]
    fn test_plain_rename() {
        let macros = table(vec![MacroDef::object(
            "cuGraphInstantiate",
            "cuGraphInstantiateWithFlags",
        )]);
        assert_eq!(macros.expand_name("cuGraphInstantiate"), "cuGraphInstantiateWithFlags");
        assert_eq!(macros.expand_name("cuGraphLaunch"), "cuGraphLaunch");
    }

    #[test]
    fn test_wrapper_renames() {
        let identity = table(vec![
            MacroDef::function("__CUDA_API_PTDS", &["api"], "api"),
            MacroDef::function("__CUDA_API_PTSZ", &["api"], "api"),
            MacroDef::object("cuMemcpy", "__CUDA_API_PTDS(cuMemcpy)"),
            MacroDef::object("cuStreamGetCaptureInfo", "__CUDA_API_PTSZ(cuStreamGetCaptureInfo_v2)"),
        ]);
        assert_eq!(identity.expand_name("cuMemcpy"), "cuMemcpy");
        assert_eq!(
            identity.expand_name("cuStreamGetCaptureInfo"),
            "cuStreamGetCaptureInfo_v2"
        );

        let per_thread = table(vec![
            MacroDef::function("__CUDA_API_PTDS", &["api"], "api ## _ptds"),
            MacroDef::object("cuMemcpy", "__CUDA_API_PTDS(cuMemcpy)"),
        ]);
        assert_eq!(per_thread.expand_name("cuMemcpy"), "cuMemcpy_ptds");
    }

    #[test]
    fn test_chained_and_cyclic_renames() {
        let macros = table(vec![
            MacroDef::object("cuA", "cuB"),
            MacroDef::object("cuB", "cuC"),
            MacroDef::object("cuLoop", "cuLoop2"),
            MacroDef::object("cuLoop2", "cuLoop"),
        ]);
        assert_eq!(macros.expand_name("cuA"), "cuC");
        assert_eq!(macros.expand_name("cuLoop"), "cuLoop");
    }

    #[test]
    fn test_non_identifier_bodies_are_ignored() {
        let macros = table(vec![
            MacroDef::object("cuConst", "(1 << 2)"),
            MacroDef::object("cuUnknownWrap", "WRAP(cuUnknownWrap_v2)"),
            MacroDef::function("cuFn", &["x"], "x"),
        ]);
        assert_eq!(macros.expand_name("cuConst"), "cuConst");
        assert_eq!(macros.expand_name("cuUnknownWrap"), "cuUnknownWrap");
        assert_eq!(macros.expand_name("cuFn"), "cuFn");
    }
}
