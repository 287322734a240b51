//! Symbol table readers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use object::{Object, ObjectSymbol};

use crate::util::diagnostic::SymbolReadError;
use crate::util::fs::read_to_string;
use crate::util::process::{find_executable, ProcessBuilder};

/// A source of exported symbol names.
pub trait SymbolSource {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// Every exported name, in table order.
    fn read(&self) -> Result<Vec<String>>;
}

/// Whether `symbol` belongs to the API with `prefix`.
///
/// Case-insensitive substring match, so both `cuInit` and `CUDA_xyz`-style
/// helpers pass for `cu`. Extra names are harmless: the resolver reports
/// them as misses.
pub fn matches_prefix(symbol: &str, prefix: &str) -> bool {
    symbol
        .to_ascii_lowercase()
        .contains(&prefix.to_ascii_lowercase())
}

/// Read `source` and keep the names matching `prefix`, in order.
pub fn exported_symbols(source: &dyn SymbolSource, prefix: &str) -> Result<Vec<String>> {
    let all = source.read()?;
    let total = all.len();
    let symbols: Vec<String> = all
        .into_iter()
        .filter(|s| matches_prefix(s, prefix))
        .collect();

    tracing::debug!(
        "{}: {} exported symbols, {} match `{}`",
        source.name(),
        total,
        symbols.len(),
        prefix
    );
    Ok(symbols)
}

/// Drop a symbol version tag (`cuInit@@libcuda.so.1` -> `cuInit`).
fn strip_version(symbol: &str) -> &str {
    symbol.split('@').next().unwrap_or(symbol)
}

/// Strip version tags, keeping one entry for a name exported under
/// several tags (`foo@V1`, `foo@@V2`).
///
/// Untagged names pass through as listed, repeats included.
fn collapse_versions<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut versioned = HashSet::new();
    symbols
        .into_iter()
        .filter_map(|symbol| {
            let name = strip_version(symbol);
            let tagged = name.len() != symbol.len();
            (!tagged || versioned.insert(name)).then(|| name.to_string())
        })
        .collect()
}

/// Reads symbols by running `nm -D --defined-only`.
#[derive(Debug, Clone)]
pub struct NmSymbolReader {
    library: PathBuf,
}

impl NmSymbolReader {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        NmSymbolReader {
            library: library.into(),
        }
    }

    /// Names from `nm` output: the third column of each line.
    ///
    /// Lines with fewer columns (undefined symbols, headers) are skipped.
    pub fn parse_output(output: &str) -> Vec<String> {
        let symbols = output.lines().filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _address = columns.next()?;
            let _kind = columns.next()?;
            columns.next()
        });
        collapse_versions(symbols)
    }
}

impl SymbolSource for NmSymbolReader {
    fn name(&self) -> &str {
        "nm"
    }

    fn read(&self) -> Result<Vec<String>> {
        if !self.library.exists() {
            return Err(SymbolReadError::new(&self.library, "no such file").into());
        }

        let nm = find_executable("nm")
            .ok_or_else(|| SymbolReadError::new(&self.library, "`nm` not found in PATH"))?;

        let output = ProcessBuilder::new(&nm)
            .args(["-D", "--defined-only"])
            .arg(&self.library)
            .env("LC_ALL", "C")
            .exec_and_check()
            .map_err(|e| SymbolReadError::new(&self.library, format!("{:#}", e).trim_end()))?;

        Ok(Self::parse_output(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Reads the dynamic symbol table in-process.
#[derive(Debug, Clone)]
pub struct ObjectSymbolReader {
    library: PathBuf,
}

impl ObjectSymbolReader {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        ObjectSymbolReader {
            library: library.into(),
        }
    }

    /// Defined dynamic symbols of an object file image.
    ///
    /// Symbol names come back without their version tag, and a name can
    /// only repeat among defined dynamic symbols when it is exported under
    /// several versions, so repeats collapse to the first.
    pub fn parse_image(library: &Path, data: &[u8]) -> Result<Vec<String>> {
        let file = object::File::parse(data)
            .map_err(|e| SymbolReadError::new(library, format!("not an object file: {}", e)))?;

        let mut names: Vec<String> = file
            .dynamic_symbols()
            .filter(|s| s.is_definition())
            .filter_map(|s| s.name().ok().map(|n| strip_version(n).to_string()))
            .filter(|n| !n.is_empty())
            .collect();

        // Formats without a dynamic symbol table list exports instead
        if names.is_empty() {
            let exports = file
                .exports()
                .map_err(|e| SymbolReadError::new(library, e.to_string()))?;
            names = exports
                .iter()
                .map(|e| String::from_utf8_lossy(e.name()).into_owned())
                .collect();
        }

        let mut seen = HashSet::new();
        names.retain(|n| seen.insert(n.clone()));
        Ok(names)
    }
}

impl SymbolSource for ObjectSymbolReader {
    fn name(&self) -> &str {
        "object"
    }

    fn read(&self) -> Result<Vec<String>> {
        let data = std::fs::read(&self.library)
            .map_err(|e| SymbolReadError::new(&self.library, e.to_string()))?;
        Self::parse_image(&self.library, &data)
    }
}

/// Reads names from a text file, one per line.
///
/// Blank lines and lines starting with `#` are ignored. Duplicates are kept.
#[derive(Debug, Clone)]
pub struct ListSymbolReader {
    path: PathBuf,
}

impl ListSymbolReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ListSymbolReader { path: path.into() }
    }

    pub fn parse(content: &str) -> Vec<String> {
        content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect()
    }
}

impl SymbolSource for ListSymbolReader {
    fn name(&self) -> &str {
        "list"
    }

    fn read(&self) -> Result<Vec<String>> {
        let content = read_to_string(&self.path)
            .with_context(|| format!("failed to read symbol list {}", self.path.display()))?;
        Ok(Self::parse(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockSymbolSource;

    const NM_OUTPUT: &str = "\
0000000000233f50 T cuCtxCreate
0000000000233f50 T cuCtxCreate_v2
00000000002341a0 T cuMemcpyHtoDAsync_v2_ptsz
0000000000240000 T cuGetProcAddress@@libcuda.so.1
0000000000240010 T cuGetProcAddress@libcuda.so.0
0000000000000000 A libcuda.so.1
                 U dlopen
";

    #[test]
    fn test_parse_nm_output() {
        let names = NmSymbolReader::parse_output(NM_OUTPUT);
        assert_eq!(
            names,
            [
                "cuCtxCreate",
                "cuCtxCreate_v2",
                "cuMemcpyHtoDAsync_v2_ptsz",
                "cuGetProcAddress",
                "libcuda.so.1",
            ]
        );
    }

    #[test]
    fn test_nm_output_keeps_untagged_repeats() {
        let names = NmSymbolReader::parse_output(
            "0000000000230000 T cuInit\n\
             0000000000230000 T cuInit\n\
             0000000000240000 T cuGetProcAddress@@libcuda.so.1\n\
             0000000000240010 T cuGetProcAddress@libcuda.so.0\n\
             0000000000240020 T cuGetProcAddress@libcuda.so.2\n",
        );
        assert_eq!(names, ["cuInit", "cuInit", "cuGetProcAddress"]);
    }

    #[test]
    fn test_prefix_match_is_case_insensitive_substring() {
        assert!(matches_prefix("cuInit", "cu"));
        assert!(matches_prefix("CUDA_ERROR", "cu"));
        assert!(matches_prefix("libcuda.so.1", "cu"));
        assert!(!matches_prefix("nvmlInit", "cu"));
    }

    #[test]
    fn test_exported_symbols_filters_in_order() {
        let source = MockSymbolSource::new(["cuInit", "nvmlInit", "cuCtxCreate_v2", "cuInit"]);
        let symbols = exported_symbols(&source, "cu").unwrap();
        assert_eq!(symbols, ["cuInit", "cuCtxCreate_v2", "cuInit"]);
    }

    #[test]
    fn test_parse_list() {
        let names = ListSymbolReader::parse("# exported\ncuInit\n\n  cuCtxCreate_v2  \ncuInit\n");
        assert_eq!(names, ["cuInit", "cuCtxCreate_v2", "cuInit"]);
    }

    #[test]
    fn test_list_reader_missing_file() {
        let err = ListSymbolReader::new("/nonexistent/symbols.txt")
            .read()
            .unwrap_err();
        assert!(format!("{:#}", err).contains("symbols.txt"));
    }

    #[test]
    fn test_nm_reader_missing_library() {
        let err = NmSymbolReader::new("/nonexistent/libcuda.so")
            .read()
            .unwrap_err();
        let err = err.downcast::<SymbolReadError>().unwrap();
        assert_eq!(err.reason, "no such file");
    }

    #[test]
    fn test_object_reader_rejects_garbage() {
        let err = ObjectSymbolReader::parse_image(Path::new("bogus.so"), b"not an elf file")
            .unwrap_err();
        assert!(err.to_string().contains("bogus.so"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_object_reader_reads_running_executable() {
        // The test binary is a PIE linked against libc, so it has a dynamic table.
        let exe = std::env::current_exe().unwrap();
        let result = ObjectSymbolReader::new(&exe).read();
        assert!(result.is_ok());
    }
}
