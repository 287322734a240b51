//! C header parser.
//!
//! Reads a single flat C translation unit and reports its top-level
//! declarations. `#include` is not followed; instead a header can start from
//! the macros an earlier header left defined. Conditional blocks are
//! evaluated against those macros, the file's own `#define`/`#undef`s and
//! the configured `defines`; a condition that cannot be decided (a
//! comparison, an unknown macro value) keeps every branch. Declarator names
//! are expanded through the macros in effect at the declaration, so
//! `#define cuCtxCreate cuCtxCreate_v2` turns a later `cuCtxCreate(...)`
//! into a declaration of `cuCtxCreate_v2`; nothing else is expanded. Type
//! spellings are normalized the way a C front end prints them
//! (`const char *`, `void **`, `void (*)(void *)`).

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use super::macros::MacroTable;
use super::types::{ArgDecl, Decl, FunctionDecl, MacroDef, OtherDecl, TranslationUnit};
use crate::util::diagnostic::HeaderParseError;

/// Decoration macros stripped from declarations by default.
pub const DEFAULT_IGNORE_TOKENS: &[&str] = &[
    "CUDAAPI",
    "__CUDA_DEPRECATED",
    "CUDA_CB",
    "__host__",
    "__device__",
];

/// Words that never name a parameter.
const TYPE_WORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "bool", "const", "volatile", "restrict", "__restrict", "struct", "union", "enum",
];

/// Storage and function specifiers dropped from result types.
const SPECIFIERS: &[&str] = &[
    "extern",
    "static",
    "inline",
    "__inline",
    "__inline__",
    "_Noreturn",
];

/// Attribute-like keywords followed by a parenthesized group.
const ATTRIBUTE_WORDS: &[&str] = &["__attribute__", "__declspec", "__asm__", "__asm"];

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*#\s*define\s+([A-Za-z_]\w*)(\(?)(.*)$").expect("static regex")
});

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*#\s*([A-Za-z_]\w*)\s*(.*)$").expect("static regex"));

static LINKAGE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"extern\s*"C(?:\+\+)?"\s*\{"#).expect("static regex"));

static LINKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"extern\s*"C(?:\+\+)?""#).expect("static regex"));

/// Produces a parse tree from a header file.
pub trait DeclarationParser {
    /// Parse the header at `path`, starting with `predefined` in effect.
    fn parse_file(&self, path: &Path, predefined: &MacroTable) -> Result<TranslationUnit>;
}

/// Parser for C header files.
#[derive(Debug, Clone)]
pub struct HeaderParser {
    /// Decoration macros to drop (calling conventions, deprecation markers)
    ignore_tokens: Vec<String>,

    /// Macros treated as defined when evaluating conditional blocks
    defines: Vec<String>,
}

impl Default for HeaderParser {
    fn default() -> Self {
        HeaderParser {
            ignore_tokens: DEFAULT_IGNORE_TOKENS.iter().map(|s| s.to_string()).collect(),
            defines: Vec::new(),
        }
    }
}

impl DeclarationParser for HeaderParser {
    fn parse_file(&self, path: &Path, predefined: &MacroTable) -> Result<TranslationUnit> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read header: {}", path.display()))?;

        let content = String::from_utf8(bytes)
            .map_err(|_| HeaderParseError::new(path, "header is not valid UTF-8"))?;

        Ok(self.parse_content_with(&content, path, predefined)?)
    }
}

impl HeaderParser {
    /// Create a new header parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set decoration macros to drop.
    pub fn with_ignore_tokens(mut self, tokens: Vec<String>) -> Self {
        self.ignore_tokens = tokens;
        self
    }

    /// Set macros that count as defined in `#ifdef` and `defined(...)`.
    pub fn with_defines(mut self, defines: Vec<String>) -> Self {
        self.defines = defines;
        self
    }

    /// Parse header content with no macros predefined.
    pub fn parse_content(
        &self,
        content: &str,
        path: &Path,
    ) -> std::result::Result<TranslationUnit, HeaderParseError> {
        self.parse_content_with(content, path, &MacroTable::new())
    }

    /// Parse header content, starting with `predefined` in effect.
    pub fn parse_content_with(
        &self,
        content: &str,
        path: &Path,
        predefined: &MacroTable,
    ) -> std::result::Result<TranslationUnit, HeaderParseError> {
        let mut unit = TranslationUnit::new(path);

        let masked = mask_comments(content)
            .map_err(|offset| HeaderParseError::at(path, content, offset, 2, "unterminated comment"))?;

        let (masked, history) = strip_directives(&masked, &self.defines, predefined);

        let (masked, linkage_blocks) = mask_linkage(&masked);

        let statements = split_statements(&masked, linkage_blocks)
            .map_err(|(offset, reason)| HeaderParseError::at(path, content, offset, 1, reason))?;

        // Replay #define/#undef up to each statement so declarators expand
        // through the macros visible at that point.
        let mut macros = predefined.clone();
        let mut history = history.into_iter().peekable();
        for statement in statements {
            while let Some((_, change)) = history.next_if(|(at, _)| *at < statement.offset) {
                change.apply(&mut macros);
            }
            let mut decl = self.classify(&statement);
            if let Decl::Function(func) = &mut decl {
                func.spelling = macros.expand_name(&func.spelling);
            }
            unit.decls.push(decl);
        }
        for (_, change) in history {
            change.apply(&mut macros);
        }
        unit.macros = macros.into_defs();

        tracing::debug!(
            "{}: {} declarations, {} functions, {} macros",
            path.display(),
            unit.decls.len(),
            unit.functions().count(),
            unit.macros.len()
        );

        Ok(unit)
    }

    /// Turn one top-level statement into a declaration node.
    fn classify(&self, statement: &Statement) -> Decl {
        let tokens = self.clean_tokens(tokenize(&statement.text));
        let other = || {
            Decl::Other(OtherDecl {
                text: spell(&tokens),
            })
        };

        if tokens.first().map(String::as_str) == Some("typedef") {
            return other();
        }

        // A function declarator ends with its parameter list.
        if tokens.last().map(String::as_str) != Some(")") {
            return other();
        }
        let Some(open) = matching_open(&tokens, tokens.len() - 1) else {
            return other();
        };
        if open < 2 {
            return other();
        }

        let name = &tokens[open - 1];
        if !is_identifier(name) || TYPE_WORDS.contains(&name.as_str()) {
            return other();
        }

        let result: Vec<String> = tokens[..open - 1]
            .iter()
            .filter(|t| !SPECIFIERS.contains(&t.as_str()))
            .cloned()
            .collect();
        if result.is_empty()
            || result
                .iter()
                .any(|t| matches!(t.as_str(), "(" | ")" | "=" | "[" | "]" | "{" | "}"))
        {
            return other();
        }

        let (arguments, variadic) = parse_arguments(&tokens[open + 1..tokens.len() - 1]);

        Decl::Function(FunctionDecl {
            spelling: name.clone(),
            result_type: spell(&result),
            arguments,
            variadic,
            is_definition: statement.has_body,
        })
    }

    /// Drop decoration macros and attribute groups.
    fn clean_tokens(&self, tokens: Vec<String>) -> Vec<String> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut i = 0;
        while i < tokens.len() {
            let tok = &tokens[i];
            if ATTRIBUTE_WORDS.contains(&tok.as_str()) {
                i += 1;
                if tokens.get(i).map(String::as_str) == Some("(") {
                    i = matching_close(&tokens, i).map_or(tokens.len(), |close| close + 1);
                }
                continue;
            }
            if !self.ignore_tokens.iter().any(|ignored| ignored == tok) {
                out.push(tok.clone());
            }
            i += 1;
        }
        out
    }
}

/// A top-level statement with comments and directives removed.
#[derive(Debug)]
struct Statement {
    text: String,
    has_body: bool,
    /// Byte offset of the first character
    offset: usize,
}

/// Replace a character with blanks of the same byte length, keeping newlines.
fn blank(out: &mut String, c: char) {
    if c == '\n' {
        out.push('\n');
    } else {
        out.extend(std::iter::repeat(' ').take(c.len_utf8()));
    }
}

/// Blank out comments, keeping byte offsets stable.
///
/// Returns the offset of an unterminated block comment on failure.
fn mask_comments(content: &str) -> std::result::Result<String, usize> {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '/' if matches!(chars.peek(), Some((_, '*'))) => {
                chars.next();
                out.push_str("  ");
                let mut closed = false;
                while let Some((_, c)) = chars.next() {
                    if c == '*' && matches!(chars.peek(), Some((_, '/'))) {
                        chars.next();
                        out.push_str("  ");
                        closed = true;
                        break;
                    }
                    blank(&mut out, c);
                }
                if !closed {
                    return Err(start);
                }
            }
            '/' if matches!(chars.peek(), Some((_, '/'))) => {
                out.push(' ');
                while let Some(&(_, c)) = chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    chars.next();
                    blank(&mut out, c);
                }
            }
            '"' | '\'' => {
                out.push(c);
                let mut escaped = false;
                while let Some(&(_, next)) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                    out.push(next);
                    if escaped {
                        escaped = false;
                    } else if next == '\\' {
                        escaped = true;
                    } else if next == c {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    Ok(out)
}

/// One open `#if` group.
#[derive(Debug, Clone, Copy)]
struct Conditional {
    /// Whether an earlier branch was taken; `None` once a condition could not
    /// be decided
    taken: Option<bool>,

    /// Whether the current branch is kept
    active: bool,
}

impl Conditional {
    fn open(value: Option<bool>) -> Self {
        Conditional {
            taken: value,
            active: value.unwrap_or(true),
        }
    }

    fn elif(&mut self, value: impl FnOnce() -> Option<bool>) {
        match self.taken {
            Some(true) => self.active = false,
            Some(false) => *self = Conditional::open(value()),
            None => self.active = true,
        }
    }

    fn otherwise(&mut self) {
        self.active = self.taken != Some(true);
        if self.taken.is_some() {
            self.taken = Some(true);
        }
    }
}

/// A `#define` or `#undef` seen in an active region.
#[derive(Debug, Clone)]
enum MacroChange {
    Define(MacroDef),
    Undef(String),
}

impl MacroChange {
    fn apply(self, macros: &mut MacroTable) {
        match self {
            MacroChange::Define(def) => macros.define(def),
            MacroChange::Undef(name) => macros.undefine(&name),
        }
    }
}

/// Tracks conditional groups and the set of defined macro names.
struct Preprocessor {
    defined: HashSet<String>,
    stack: Vec<Conditional>,
    /// Macro changes with the byte offset of their directive
    history: Vec<(usize, MacroChange)>,
}

impl Preprocessor {
    fn new(defines: &[String], predefined: &MacroTable) -> Self {
        Preprocessor {
            defined: defines
                .iter()
                .cloned()
                .chain(predefined.iter().map(|m| m.name.clone()))
                .collect(),
            stack: Vec::new(),
            history: Vec::new(),
        }
    }

    /// Whether text at the current position is kept.
    fn active(&self) -> bool {
        self.stack.iter().all(|c| c.active)
    }

    fn directive(&mut self, offset: usize, text: &str) {
        let Some(cap) = DIRECTIVE_RE.captures(text) else {
            return;
        };
        let rest = cap[2].trim();
        let active = self.active();

        match &cap[1] {
            "if" => {
                let value = if active { self.evaluate(rest) } else { Some(false) };
                self.stack.push(Conditional::open(value));
            }
            "ifdef" | "ifndef" => {
                let defined = self.defined.contains(first_word(rest));
                let value = if &cap[1] == "ifdef" { defined } else { !defined };
                self.stack.push(Conditional::open(Some(active && value)));
            }
            "elif" => {
                let value = self.evaluate(rest);
                if let Some(top) = self.stack.last_mut() {
                    top.elif(|| value);
                }
            }
            "else" => {
                if let Some(top) = self.stack.last_mut() {
                    top.otherwise();
                }
            }
            "endif" => {
                self.stack.pop();
            }
            "define" if active => {
                if let Some(def) = parse_define(text) {
                    self.defined.insert(def.name.clone());
                    self.history.push((offset, MacroChange::Define(def)));
                }
            }
            "undef" if active => {
                let name = first_word(rest).to_string();
                self.defined.remove(&name);
                self.history.push((offset, MacroChange::Undef(name)));
            }
            _ => {}
        }
    }

    /// Evaluate a `#if` expression; `None` when it cannot be decided.
    fn evaluate(&self, expr: &str) -> Option<bool> {
        let tokens = condition_tokens(expr);
        let mut cursor = Condition {
            tokens: &tokens,
            pos: 0,
            defined: &self.defined,
        };
        let value = cursor.or()?;
        if cursor.pos != tokens.len() {
            return None;
        }
        value
    }
}

fn first_word(text: &str) -> &str {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .next()
        .unwrap_or("")
}

/// Split a `#if` expression into words and operators.
fn condition_tokens(expr: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if !(next.is_alphanumeric() || next == '_') {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(word);
            }
            '&' | '|' if chars.peek() == Some(&c) => {
                chars.next();
                tokens.push(format!("{c}{c}"));
            }
            '!' if chars.peek() == Some(&'=') => {
                chars.next();
                tokens.push("!=".to_string());
            }
            _ => tokens.push(c.to_string()),
        }
    }
    tokens
}

/// Recursive-descent evaluator over `defined`, `!`, `&&`, `||`, parentheses
/// and integer literals.
///
/// The outer `Option` is a syntax failure; the inner one is an undecidable
/// value. Anything outside the supported grammar makes the whole condition
/// undecidable.
struct Condition<'a> {
    tokens: &'a [String],
    pos: usize,
    defined: &'a HashSet<String>,
}

impl Condition<'_> {
    fn peek(&self) -> Option<&str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn next(&mut self) -> Option<&str> {
        let tok = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(tok.as_str())
    }

    fn or(&mut self) -> Option<Option<bool>> {
        let mut value = self.and()?;
        while self.peek() == Some("||") {
            self.pos += 1;
            let rhs = self.and()?;
            value = match (value, rhs) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            };
        }
        Some(value)
    }

    fn and(&mut self) -> Option<Option<bool>> {
        let mut value = self.unary()?;
        while self.peek() == Some("&&") {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match (value, rhs) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            };
        }
        Some(value)
    }

    fn unary(&mut self) -> Option<Option<bool>> {
        if self.peek() == Some("!") {
            self.pos += 1;
            return self.unary().map(|v| v.map(|b| !b));
        }
        self.primary()
    }

    fn primary(&mut self) -> Option<Option<bool>> {
        let tok = self.next()?.to_string();
        match tok.as_str() {
            "(" => {
                let value = self.or()?;
                (self.next()? == ")").then_some(value)
            }
            "defined" => {
                let parenthesized = self.peek() == Some("(");
                if parenthesized {
                    self.pos += 1;
                }
                let name = self.next()?.to_string();
                if !is_identifier(&name) || (parenthesized && self.next()? != ")") {
                    return None;
                }
                Some(Some(self.defined.contains(&name)))
            }
            t if t.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
                let digits = t.trim_end_matches(['u', 'U', 'l', 'L']);
                Some(digits.parse::<u64>().ok().map(|n| n != 0))
            }
            t if is_identifier(t) => Some(None),
            _ => None,
        }
    }
}

/// Blank out preprocessor directives and lines in excluded conditional
/// blocks, returning the macro changes in source order.
fn strip_directives(
    content: &str,
    defines: &[String],
    predefined: &MacroTable,
) -> (String, Vec<(usize, MacroChange)>) {
    let mut out = String::with_capacity(content.len());
    let mut pp = Preprocessor::new(defines, predefined);
    let mut directive: Option<(usize, String)> = None;

    for line in content.split_inclusive('\n') {
        let offset = out.len();
        let body = line.trim_end_matches(['\n', '\r']);
        let starts_directive = directive.is_none() && body.trim_start().starts_with('#');

        if directive.is_none() && !starts_directive {
            if pp.active() {
                out.push_str(line);
            } else {
                line.chars().for_each(|c| blank(&mut out, c));
            }
            continue;
        }

        line.chars().for_each(|c| blank(&mut out, c));

        let (_, text) = directive.get_or_insert_with(|| (offset, String::new()));
        let continued = body.trim_end().ends_with('\\');
        text.push_str(body.trim_end().trim_end_matches('\\'));
        text.push(' ');

        if !continued {
            if let Some((at, text)) = directive.take() {
                pp.directive(at, &text);
            }
        }
    }

    if let Some((at, text)) = directive {
        pp.directive(at, &text);
    }

    (out, pp.history)
}

/// Parse a `#define` directive.
fn parse_define(directive: &str) -> Option<MacroDef> {
    let cap = DEFINE_RE.captures(directive)?;
    let name = cap[1].to_string();
    let rest = &cap[3];

    if cap[2].is_empty() {
        return Some(MacroDef::object(name, normalize_body(rest)));
    }

    let (params, body) = rest.split_once(')')?;
    let params = params
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Some(MacroDef {
        name,
        params: Some(params),
        body: normalize_body(body),
    })
}

fn normalize_body(body: &str) -> String {
    body.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Blank out `extern "C"` markers, returning how many opened a block.
fn mask_linkage(content: &str) -> (String, usize) {
    let blocks = LINKAGE_BLOCK_RE.find_iter(content).count();
    let masked = LINKAGE_BLOCK_RE.replace_all(content, |caps: &regex::Captures| {
        " ".repeat(caps[0].len())
    });
    let masked = LINKAGE_RE.replace_all(&masked, |caps: &regex::Captures| {
        " ".repeat(caps[0].len())
    });
    (masked.into_owned(), blocks)
}

/// Split a masked translation unit into top-level statements.
///
/// Function bodies are skipped; the statement keeps only the declarator.
/// Errors carry the offset of the offending character.
fn split_statements(
    content: &str,
    linkage_blocks: usize,
) -> std::result::Result<Vec<Statement>, (usize, &'static str)> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut open_braces: Vec<usize> = Vec::new();
    let mut open_parens: Vec<usize> = Vec::new();
    let mut in_body = false;
    let mut linkage_open = linkage_blocks;
    let mut start = 0;

    let mut chars = content.char_indices().peekable();
    while let Some((offset, c)) = chars.next() {
        if !in_body && !c.is_whitespace() && current.is_empty() {
            start = offset;
        }
        match c {
            '"' | '\'' => {
                let mut literal = String::from(c);
                let mut escaped = false;
                for (_, next) in chars.by_ref() {
                    literal.push(next);
                    if escaped {
                        escaped = false;
                    } else if next == '\\' {
                        escaped = true;
                    } else if next == c || next == '\n' {
                        break;
                    }
                }
                if !in_body {
                    current.push_str(&literal);
                }
            }
            '(' if !in_body => {
                open_parens.push(offset);
                current.push(c);
            }
            ')' if !in_body => {
                if open_parens.pop().is_none() {
                    return Err((offset, "unbalanced ')'"));
                }
                current.push(c);
            }
            '{' => {
                if open_braces.is_empty() && !in_body {
                    if let Some(&paren) = open_parens.first() {
                        return Err((paren, "unclosed '('"));
                    }
                    let head = current.trim_end();
                    if head.ends_with(')') && !head.contains('=') {
                        in_body = true;
                    } else {
                        current.push(c);
                    }
                } else if !in_body {
                    current.push(c);
                }
                open_braces.push(offset);
            }
            '}' => {
                if open_braces.pop().is_none() {
                    if linkage_open == 0 {
                        return Err((offset, "unbalanced '}'"));
                    }
                    linkage_open -= 1;
                    flush(&mut statements, &mut current, start, false);
                    continue;
                }
                if in_body {
                    if open_braces.is_empty() {
                        in_body = false;
                        flush(&mut statements, &mut current, start, true);
                    }
                } else {
                    current.push(c);
                }
            }
            ';' if open_braces.is_empty() => {
                if let Some(&paren) = open_parens.first() {
                    return Err((paren, "unclosed '('"));
                }
                flush(&mut statements, &mut current, start, false);
            }
            _ if in_body => {}
            _ if current.is_empty() && c.is_whitespace() => {}
            _ => current.push(c),
        }
    }

    if let Some(&brace) = open_braces.first() {
        return Err((brace, "unclosed '{'"));
    }
    if let Some(&paren) = open_parens.first() {
        return Err((paren, "unclosed '('"));
    }
    flush(&mut statements, &mut current, start, false);

    Ok(statements)
}

fn flush(statements: &mut Vec<Statement>, current: &mut String, offset: usize, has_body: bool) {
    let text = current.split_whitespace().collect::<Vec<_>>().join(" ");
    current.clear();
    if !text.is_empty() {
        statements.push(Statement {
            text,
            has_body,
            offset,
        });
    }
}

/// Split C source text into identifier, punctuation and literal tokens.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

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
        } else if c == '.' && chars.peek() == Some(&'.') {
            chars.next();
            if chars.peek() == Some(&'.') {
                chars.next();
            }
            tokens.push("...".to_string());
        } else if c == '"' || c == '\'' {
            let mut literal = String::from(c);
            for next in chars.by_ref() {
                literal.push(next);
                if next == c {
                    break;
                }
            }
            tokens.push(literal);
        } else {
            tokens.push(c.to_string());
        }
    }

    tokens
}

pub(super) fn is_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && token.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Index of the `(` matching the `)` at `close`.
fn matching_open(tokens: &[String], close: usize) -> Option<usize> {
    let mut depth = 0usize;
    for i in (0..=close).rev() {
        match tokens[i].as_str() {
            ")" => depth += 1,
            "(" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Index of the `)` matching the `(` at `open`.
fn matching_close(tokens: &[String], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, tok) in tokens.iter().enumerate().skip(open) {
        match tok.as_str() {
            "(" => depth += 1,
            ")" => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a token list on commas outside any grouping.
fn split_top_level(tokens: &[String]) -> Vec<&[String]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, tok) in tokens.iter().enumerate() {
        match tok.as_str() {
            "(" | "[" => depth += 1,
            ")" | "]" => depth = depth.saturating_sub(1),
            "," if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }

    parts
}

/// Parse an argument list, returning arguments and the variadic flag.
fn parse_arguments(tokens: &[String]) -> (Vec<ArgDecl>, bool) {
    if tokens.is_empty() || (tokens.len() == 1 && tokens[0] == "void") {
        return (Vec::new(), false);
    }

    let mut args = Vec::new();
    let mut variadic = false;
    for part in split_top_level(tokens) {
        if part.len() == 1 && part[0] == "..." {
            variadic = true;
            continue;
        }
        if !part.is_empty() {
            args.push(parse_param(part));
        }
    }

    (args, variadic)
}

/// Split one parameter into its name and type spelling.
fn parse_param(tokens: &[String]) -> ArgDecl {
    // Function pointer: R (*name)(args)
    if let Some(open) = tokens
        .windows(2)
        .position(|w| w[0] == "(" && w[1] == "*")
    {
        if let Some(close) = matching_close(tokens, open) {
            let name = tokens[open + 2..close]
                .iter()
                .rev()
                .find(|t| is_identifier(t) && !TYPE_WORDS.contains(&t.as_str()))
                .cloned()
                .unwrap_or_default();

            let inner = match tokens.get(close + 1).map(String::as_str) {
                Some("(") => {
                    let end = matching_close(tokens, close + 1).unwrap_or(tokens.len());
                    let inner_tokens = &tokens[close + 2..end.min(tokens.len())];
                    let (inner_args, inner_variadic) = parse_arguments(inner_tokens);
                    let mut spelled: Vec<String> =
                        inner_args.into_iter().map(|a| a.type_spelling).collect();
                    if inner_variadic {
                        spelled.push("...".to_string());
                    }
                    if spelled.is_empty() && inner_tokens.len() == 1 {
                        "void".to_string()
                    } else {
                        spelled.join(", ")
                    }
                }
                _ => String::new(),
            };

            return ArgDecl::new(name, format!("{} (*)({})", spell(&tokens[..open]), inner));
        }
    }

    // Arrays: T name[N]...
    if let Some(first_bracket) = tokens.iter().position(|t| t == "[") {
        let base = &tokens[..first_bracket];
        let (name, base) = split_name(base);
        let dims = &tokens[first_bracket..];
        let inner_dims: Vec<String> = split_dimensions(dims).into_iter().skip(1).collect();

        let ty = if inner_dims.is_empty() {
            spell_pointer(base)
        } else {
            format!("{} (*){}", spell(base), inner_dims.concat())
        };
        return ArgDecl::new(name, ty);
    }

    let (name, ty) = split_name(tokens);
    ArgDecl::new(name, spell(ty))
}

/// Separate a trailing parameter name from its type tokens.
fn split_name(tokens: &[String]) -> (String, &[String]) {
    if tokens.len() < 2 {
        return (String::new(), tokens);
    }

    let last = &tokens[tokens.len() - 1];
    let before = tokens[tokens.len() - 2].as_str();
    let is_name = is_identifier(last)
        && !TYPE_WORDS.contains(&last.as_str())
        && !matches!(before, "struct" | "union" | "enum");

    if is_name {
        (last.clone(), &tokens[..tokens.len() - 1])
    } else {
        (String::new(), tokens)
    }
}

/// Spell each `[...]` group of an array declarator.
fn split_dimensions(tokens: &[String]) -> Vec<String> {
    let mut dims = Vec::new();
    let mut current = String::new();
    for tok in tokens {
        match tok.as_str() {
            "[" => current = String::from("["),
            "]" => {
                current.push(']');
                dims.push(std::mem::take(&mut current));
            }
            other => current.push_str(other),
        }
    }
    dims
}

fn spell_pointer(base: &[String]) -> String {
    let mut tokens = base.to_vec();
    tokens.push("*".to_string());
    spell(&tokens)
}

/// Join type tokens the way a C front end prints them.
fn spell(tokens: &[String]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;

    for tok in tokens {
        let tok = tok.as_str();
        if let Some(p) = prev {
            let glued = matches!(p, "*" | "(" | "[")
                || matches!(tok, ")" | "]" | "," | "[" | "(");
            if !glued || (tok == "(" && is_identifier(p)) {
                out.push(' ');
            }
        }
        out.push_str(tok);
        prev = Some(tok);
    }

    out
}
