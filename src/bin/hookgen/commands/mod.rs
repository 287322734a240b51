//! Command implementations

pub mod completions;
pub mod generate;
pub mod resolve;
pub mod signatures;
pub mod symbols;

use anyhow::{Context, Result};

use crate::cli::{ConfigArgs, LibraryArgs};
use hookgen::util::config::{HookConfig, SymbolReaderKind};

/// Load the configuration named on the command line, or discover it.
pub fn load_config(args: &ConfigArgs) -> Result<HookConfig> {
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    HookConfig::discover(args.config.as_deref(), &cwd)
}

/// Apply symbol source overrides from the command line.
pub fn apply_library_args(config: &mut HookConfig, args: &LibraryArgs) {
    if let Some(ref library) = args.library {
        config.target.library = library.clone();
    }
    if let Some(ref list) = args.symbols_file {
        config.symbols.reader = SymbolReaderKind::List;
        config.symbols.list_file = Some(list.clone());
    }
    if let Some(reader) = args.reader {
        config.symbols.reader = reader;
    }
}
