//! `hookgen resolve` command

use anyhow::{bail, Result};

use super::load_config;
use crate::cli::ResolveArgs;
use hookgen::ops;
use hookgen::resolver::{Resolution, SignatureResolver};
use hookgen::util::diagnostic::emit;

pub fn execute(args: ResolveArgs, color: bool) -> Result<()> {
    let config = load_config(&args.config)?;
    let (_, extraction) = ops::extract(&config)?;
    let resolver = SignatureResolver::new(&extraction.table, &config.canonical);

    let mut misses = 0;
    for resolution in resolver.resolve_all(&args.names) {
        match resolution {
            Resolution::Resolved(ref r) => {
                println!("{} -> {} ({})", r.exported, r.key, r.tier);
                println!("    {}", r.signature());
                println!("    declared in {}", r.entry.source.display());
            }
            Resolution::Unresolved { .. } => {
                misses += 1;
                if let Some(diagnostic) = resolution.diagnostic() {
                    emit(&diagnostic, color);
                }
            }
        }
    }

    if misses > 0 {
        bail!("{} of {} names did not resolve", misses, args.names.len());
    }
    Ok(())
}
