//! hookgen CLI - interposition trampolines for versioned C APIs

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hookgen::util::diagnostic::{render_report, HeaderParseError};

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        match e.chain().find_map(|cause| cause.downcast_ref::<HeaderParseError>()) {
            Some(parse_error) => {
                eprintln!("error: {:#}", e);
                eprint!("{}", render_report(parse_error, color));
            }
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("hookgen=debug")
    } else {
        EnvFilter::new("hookgen=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(color)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Generate(args) => commands::generate::execute(args, color),
        Commands::Symbols(args) => commands::symbols::execute(args),
        Commands::Signatures(args) => commands::signatures::execute(args),
        Commands::Resolve(args) => commands::resolve::execute(args, color),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
