//! Header parsing and signature extraction.
//!
//! [`HeaderParser`] turns a C header into a [`TranslationUnit`];
//! [`SignatureExtractor`] turns its prefixed function declarations, renamed
//! through the [`MacroTable`] in effect, into signature table registrations.

pub mod extract;
pub mod macros;
pub mod parser;
pub mod types;

pub use extract::{extract_headers, Extraction, SignatureExtractor};
pub use macros::MacroTable;
pub use parser::{DeclarationParser, HeaderParser};
pub use types::{ArgDecl, Decl, FunctionDecl, MacroDef, OtherDecl, TranslationUnit};
