//! `hookgen signatures` command

use anyhow::Result;

use super::load_config;
use crate::cli::SignaturesArgs;
use hookgen::ops;

pub fn execute(args: SignaturesArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let (_, extraction) = ops::extract(&config)?;
    let entries: Vec<_> = extraction.table.iter().collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
    for entry in entries {
        println!(
            "{:<width$}  {:<7}  {}",
            entry.key,
            entry.kind.to_string(),
            entry.signature,
            width = width
        );
    }

    Ok(())
}
