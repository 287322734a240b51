//! Declared function signatures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A function signature as declared in a header.
///
/// Type spellings are kept literally; they are copied into generated code,
/// never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Declared function name
    pub name: String,

    /// Result type spelling (e.g. `CUresult`)
    pub return_type: String,

    /// Parameters in call-argument order
    pub params: Vec<Param>,

    /// Whether the declaration ends in `...`
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub variadic: bool,
}

impl Signature {
    /// Create a signature with no parameters.
    pub fn new(name: impl Into<String>, return_type: impl Into<String>) -> Self {
        Signature {
            name: name.into(),
            return_type: return_type.into(),
            params: Vec::new(),
            variadic: false,
        }
    }

    /// Add a parameter.
    pub fn with_param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    /// Mark the signature as variadic.
    pub fn with_variadic(mut self, variadic: bool) -> Self {
        self.variadic = variadic;
        self
    }

    /// Whether the function returns `void`.
    pub fn returns_void(&self) -> bool {
        self.return_type.trim() == "void"
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.return_type, self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param.declaration(i))?;
        }
        if self.variadic {
            if self.params.is_empty() {
                write!(f, "...")?;
            } else {
                write!(f, ", ...")?;
            }
        }
        write!(f, ")")
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name (empty for unnamed parameters)
    pub name: String,

    /// Type spelling
    #[serde(rename = "type")]
    pub ty: String,
}

impl Param {
    /// Create a new parameter.
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            ty: ty.into(),
        }
    }

    /// Name used when forwarding this parameter at `position`.
    ///
    /// Unnamed parameters get a positional placeholder (`arg0`, `arg1`, ...).
    pub fn binding(&self, position: usize) -> String {
        if self.name.is_empty() {
            format!("arg{}", position)
        } else {
            self.name.clone()
        }
    }

    /// Render `type name`, placing the name inside function-pointer spellings.
    ///
    /// `void (*)(void *)` with name `fn` renders as `void (*fn)(void *)`; the
    /// name goes at the end of the pointer group, after every `*` and
    /// qualifier in it.
    pub fn declaration(&self, position: usize) -> String {
        let name = self.binding(position);
        match self.ty.find("(*") {
            Some(idx) => {
                let close = self.ty[idx..].find(')').map_or(self.ty.len(), |i| idx + i);
                let (head, tail) = self.ty.split_at(close);
                let sep = if head.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
                    " "
                } else {
                    ""
                };
                format!("{}{}{}{}", head, sep, name, tail)
            }
            None if self.ty.ends_with('*') => format!("{}{}", self.ty, name),
            None => format!("{} {}", self.ty, name),
        }
    }
}
