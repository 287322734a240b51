//! `hookgen symbols` command

use anyhow::Result;

use super::{apply_library_args, load_config};
use crate::cli::SymbolsArgs;
use hookgen::ops;
use hookgen::sources::exported_symbols;

pub fn execute(args: SymbolsArgs) -> Result<()> {
    let mut config = load_config(&args.config)?;
    apply_library_args(&mut config, &args.library);

    let source = ops::symbol_source(&config)?;
    for symbol in exported_symbols(source.as_ref(), &config.target.prefix)? {
        println!("{}", symbol);
    }

    Ok(())
}
