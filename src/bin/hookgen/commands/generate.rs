//! `hookgen generate` command

use anyhow::Result;

use super::{apply_library_args, load_config};
use crate::cli::GenerateArgs;
use hookgen::ops::{self, GenerateOptions};
use hookgen::util::diagnostic::emit;

pub fn execute(args: GenerateArgs, color: bool) -> Result<()> {
    let mut config = load_config(&args.config)?;
    apply_library_args(&mut config, &args.library);
    if let Some(output) = args.output {
        config.output.path = output;
    }

    let source = ops::symbol_source(&config)?;
    let opts = GenerateOptions { check: args.check };
    let report = ops::generate(&config, source.as_ref(), &opts)?;

    for diagnostic in &report.diagnostics {
        emit(diagnostic, color);
    }

    let verb = match (args.check, report.changed) {
        (true, _) => "Checked",
        (false, true) => "Generated",
        (false, false) => "Unchanged",
    };
    eprintln!(
        "    {} {} ({} trampolines, {} skipped)",
        verb,
        report.output.display(),
        report.emitted,
        report.skipped
    );

    Ok(())
}
