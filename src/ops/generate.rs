//! The `generate` operation.
//!
//! Extraction, symbol listing, resolution and rendering in one run. Any fatal
//! error aborts before the output file is touched.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::bindings::{extract_headers, Extraction, HeaderParser, SignatureExtractor};
use crate::emit::{render, CppBackend, EmitContext, Rendered};
use crate::resolver::SignatureResolver;
use crate::sources::{
    exported_symbols, ListSymbolReader, NmSymbolReader, ObjectSymbolReader, SymbolSource,
};
use crate::util::config::{HookConfig, SymbolReaderKind};
use crate::util::diagnostic::Diagnostic;
use crate::util::fs::{read_to_string, write_atomic};

/// Options for `generate`.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Compare with the existing output instead of writing it
    pub check: bool,
}

/// Outcome of a `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    /// Exported symbols considered
    pub exported: usize,

    /// Trampolines written
    pub emitted: usize,

    /// Exported symbols without a trampoline
    pub skipped: usize,

    /// One diagnostic per skipped symbol
    pub diagnostics: Vec<Diagnostic>,

    /// Destination file
    pub output: PathBuf,

    /// Whether the destination content changed (or would change, in check mode)
    pub changed: bool,
}

/// Build the symbol source selected by the configuration.
pub fn symbol_source(config: &HookConfig) -> Result<Box<dyn SymbolSource>> {
    let source: Box<dyn SymbolSource> = match config.symbols.reader {
        SymbolReaderKind::Nm => Box::new(NmSymbolReader::new(&config.target.library)),
        SymbolReaderKind::Object => Box::new(ObjectSymbolReader::new(&config.target.library)),
        SymbolReaderKind::List => match &config.symbols.list_file {
            Some(path) => Box::new(ListSymbolReader::new(path)),
            None => bail!("`symbols.reader = \"list\"` requires `symbols.list_file`"),
        },
    };
    Ok(source)
}

/// Parse the configured headers into a signature table.
pub fn extract(config: &HookConfig) -> Result<(Vec<PathBuf>, Extraction)> {
    let headers = config.header_paths()?;
    if headers.is_empty() {
        bail!("no headers configured; set `target.headers`");
    }

    let parser = HeaderParser::new()
        .with_ignore_tokens(config.parser.ignore_tokens.clone())
        .with_defines(config.parser.defines.clone());
    let extractor = SignatureExtractor::new(&config.target.prefix, config.canonical.clone());
    let extraction = extract_headers(&parser, &extractor, &headers)?;

    tracing::debug!(
        "signature table: {} keys from {} headers, {} duplicate registrations dropped",
        extraction.table.len(),
        headers.len(),
        extraction.discarded
    );
    Ok((headers, extraction))
}

/// Backend settings for one output file.
pub fn emit_context(config: &HookConfig, headers: &[PathBuf], extraction: &Extraction) -> EmitContext {
    let mut undefs: Vec<String> = Vec::new();
    for name in extraction
        .aliasing_macros
        .iter()
        .chain(&config.output.extra_undefs)
    {
        if !undefs.contains(name) {
            undefs.push(name.clone());
        }
    }

    EmitContext {
        library: config.target.library.clone(),
        includes: config.output.includes.clone(),
        undefs,
        headers: headers.to_vec(),
        triple: config.target.triple.clone(),
    }
}

/// Resolve `symbols` and render the output text.
pub fn render_hooks(
    config: &HookConfig,
    headers: &[PathBuf],
    extraction: &Extraction,
    symbols: &[String],
) -> Rendered {
    let resolutions =
        SignatureResolver::new(&extraction.table, &config.canonical).resolve_all(symbols);
    let ctx = emit_context(config, headers, extraction);
    render(&CppBackend::new(), &ctx, &resolutions)
}

/// Generate trampolines for every symbol `source` exports.
pub fn generate(
    config: &HookConfig,
    source: &dyn SymbolSource,
    opts: &GenerateOptions,
) -> Result<GenerateReport> {
    let (headers, extraction) = extract(config)?;

    let symbols = exported_symbols(source, &config.target.prefix).with_context(|| {
        format!(
            "failed to list exported symbols of {}",
            config.target.library.display()
        )
    })?;
    if symbols.is_empty() {
        tracing::warn!(
            "no exported symbols match prefix `{}`",
            config.target.prefix
        );
    }

    let rendered = render_hooks(config, &headers, &extraction, &symbols);
    let output = config.output.path.clone();

    let existing = if output.exists() {
        Some(read_to_string(&output)?)
    } else {
        None
    };
    let changed = existing.as_deref() != Some(rendered.text.as_str());

    if opts.check {
        if changed {
            bail!(
                "{} is out of date; run `hookgen generate` to update it",
                output.display()
            );
        }
    } else if changed {
        write_atomic(&output, &rendered.text)?;
    }

    tracing::info!(
        "{} trampolines for {} exported symbols ({} skipped) -> {}",
        rendered.emitted,
        symbols.len(),
        rendered.diagnostics.len(),
        output.display()
    );

    Ok(GenerateReport {
        exported: symbols.len(),
        emitted: rendered.emitted,
        skipped: symbols.len() - rendered.emitted,
        diagnostics: rendered.diagnostics,
        output,
        changed,
    })
}
