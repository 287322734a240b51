//! Parse tree produced by the header parser.
//!
//! Only what signature extraction needs is modelled: function declarations
//! with their spelled types, the macros left defined at the end of the file,
//! and an opaque node for any other top-level statement.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A parsed header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Source file path
    pub source: PathBuf,

    /// Top-level declarations in source order
    pub decls: Vec<Decl>,

    /// Macros in effect at the end of the file, including any the parse
    /// started with, in definition order
    pub macros: Vec<MacroDef>,
}

impl TranslationUnit {
    /// Create an empty translation unit.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        TranslationUnit {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Source file path.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Walk top-level declarations in pre-order.
    pub fn walk_preorder(&self) -> impl Iterator<Item = &Decl> {
        self.decls.iter()
    }

    /// Function declarations in source order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls.iter().filter_map(|d| match d {
            Decl::Function(f) => Some(f),
            Decl::Other(_) => None,
        })
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    /// A function declaration or definition
    Function(FunctionDecl),
    /// Any other statement (typedefs, variables, struct definitions)
    Other(OtherDecl),
}

/// A statement that is not a function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherDecl {
    pub text: String,
}

/// A function declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    /// Function name, after expanding any renaming macro
    pub spelling: String,

    /// Result type spelling
    pub result_type: String,

    /// Arguments in declaration order
    pub arguments: Vec<ArgDecl>,

    /// Whether the argument list ends in `...`
    pub variadic: bool,

    /// Whether the declaration carries a body
    pub is_definition: bool,
}

/// A function argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgDecl {
    /// Argument name (empty when unnamed)
    pub spelling: String,

    /// Type spelling
    pub type_spelling: String,
}

impl ArgDecl {
    pub fn new(spelling: impl Into<String>, type_spelling: impl Into<String>) -> Self {
        ArgDecl {
            spelling: spelling.into(),
            type_spelling: type_spelling.into(),
        }
    }
}

/// A macro definition (`#define NAME BODY` or `#define NAME(a, b) BODY`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroDef {
    pub name: String,

    /// Parameter names of a function-like macro
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<String>>,

    pub body: String,
}

impl MacroDef {
    /// An object-like macro.
    pub fn object(name: impl Into<String>, body: impl Into<String>) -> Self {
        MacroDef {
            name: name.into(),
            params: None,
            body: body.into(),
        }
    }

    /// A function-like macro.
    pub fn function(name: impl Into<String>, params: &[&str], body: impl Into<String>) -> Self {
        MacroDef {
            name: name.into(),
            params: Some(params.iter().map(|p| p.to_string()).collect()),
            body: body.into(),
        }
    }

    pub fn is_object_like(&self) -> bool {
        self.params.is_none()
    }
}
