//! Configuration file support.
//!
//! A run is described by `hookgen.toml`. Every key is optional; the defaults
//! target the CUDA driver API as installed by the CUDA toolkit on x86_64
//! Linux. Relative paths are resolved against the directory holding the
//! config file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::bindings::parser::DEFAULT_IGNORE_TOKENS;
use crate::core::canonical::Canonicalizer;

/// Config file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "hookgen.toml";

/// Generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfig {
    /// Library and headers to generate for
    pub target: TargetConfig,

    /// Naming conventions of the API
    pub canonical: Canonicalizer,

    /// Header parser settings
    pub parser: ParserConfig,

    /// Where exported symbols come from
    pub symbols: SymbolsConfig,

    /// Generated file settings
    pub output: OutputConfig,
}

/// The API being hooked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Shared library whose exports are hooked
    pub library: PathBuf,

    /// Prefix of API function names
    pub prefix: String,

    /// Target triple the headers are read for
    pub triple: String,

    /// Headers declaring the API, in priority order. Glob patterns allowed.
    pub headers: Vec<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        TargetConfig {
            library: PathBuf::from("/usr/lib/x86_64-linux-gnu/libcuda.so"),
            prefix: "cu".to_string(),
            triple: "x86_64-unknown-linux-gnu".to_string(),
            headers: [
                "/usr/local/cuda/include/cuda.h",
                "/usr/local/cuda/targets/x86_64-linux/include/cudaEGL.h",
                "/usr/local/cuda/targets/x86_64-linux/include/cudaGL.h",
                "/usr/local/cuda/targets/x86_64-linux/include/cudaProfiler.h",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Header parser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Decoration macros removed before parsing
    pub ignore_tokens: Vec<String>,

    /// Macros treated as defined in conditional blocks
    pub defines: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            ignore_tokens: DEFAULT_IGNORE_TOKENS.iter().map(|s| s.to_string()).collect(),
            defines: Vec::new(),
        }
    }
}

/// How exported symbols are listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SymbolReaderKind {
    /// Run `nm -D`
    #[default]
    Nm,
    /// Read the dynamic symbol table in-process
    Object,
    /// Read names from `symbols.list_file`
    List,
}

/// Exported symbol settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SymbolsConfig {
    pub reader: SymbolReaderKind,

    /// Name list for the `list` reader
    pub list_file: Option<PathBuf>,
}

/// Generated file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Destination of the generated source
    pub path: PathBuf,

    /// Headers included by the generated source
    pub includes: Vec<String>,

    /// Macros to `#undef` besides the ones found in the headers
    pub extra_undefs: Vec<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: PathBuf::from("cuda_hook.gen.cc"),
            includes: ["cuda.h", "cudaEGL.h", "cudaGL.h", "cudaProfiler.h"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            extra_undefs: Vec::new(),
        }
    }
}

impl HookConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&contents, base)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Parse configuration text, resolving relative paths against `base`.
    pub fn parse(contents: &str, base: &Path) -> Result<Self> {
        let mut config: HookConfig = toml::from_str(contents)?;
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `hookgen.toml` in `cwd` if present, else
    /// the defaults.
    pub fn discover(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let candidate = cwd.join(CONFIG_FILE_NAME);
        if candidate.exists() {
            tracing::debug!("using {}", candidate.display());
            Self::load(&candidate)
        } else {
            tracing::debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            Ok(Self::default())
        }
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        self.target.library = resolve(&self.target.library);
        self.target.headers = self
            .target
            .headers
            .iter()
            .map(|h| resolve(Path::new(h)).to_string_lossy().into_owned())
            .collect();
        self.symbols.list_file = self.symbols.list_file.as_deref().map(resolve);
        self.output.path = resolve(&self.output.path);
    }

    fn validate(&self) -> Result<()> {
        if self.target.prefix.is_empty() {
            bail!("`target.prefix` must not be empty");
        }
        if self.symbols.reader == SymbolReaderKind::List && self.symbols.list_file.is_none() {
            bail!("`symbols.reader = \"list\"` requires `symbols.list_file`");
        }
        Ok(())
    }

    /// Header paths in configured order, with glob patterns expanded.
    ///
    /// A pattern expands to its matches in sorted order. Plain paths are
    /// kept even if missing so the parser reports them.
    pub fn header_paths(&self) -> Result<Vec<PathBuf>> {
        let mut headers = Vec::new();

        for pattern in &self.target.headers {
            if !pattern.contains(['*', '?', '[']) {
                headers.push(PathBuf::from(pattern));
                continue;
            }

            let mut matches = glob::glob(pattern)
                .with_context(|| format!("invalid header pattern: {}", pattern))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .with_context(|| format!("failed to expand header pattern: {}", pattern))?;
            if matches.is_empty() {
                bail!("header pattern `{}` matched no files", pattern);
            }
            matches.sort();
            headers.extend(matches);
        }

        Ok(headers)
    }
}
