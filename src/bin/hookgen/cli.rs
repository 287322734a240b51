//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use hookgen::util::config::SymbolReaderKind;

/// hookgen - interposition trampolines for versioned C APIs
#[derive(Parser)]
#[command(name = "hookgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate trampolines for every exported symbol
    Generate(GenerateArgs),

    /// List the exported symbols of the target library
    Symbols(SymbolsArgs),

    /// Dump the signature table built from the headers
    Signatures(SignaturesArgs),

    /// Show which declaration each name resolves to
    Resolve(ResolveArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that reads the configuration.
#[derive(Args, Clone, Default)]
pub struct ConfigArgs {
    /// Path to hookgen.toml (defaults to ./hookgen.toml if present)
    #[arg(long, short = 'c', env = "HOOKGEN_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Options selecting where exported symbols come from.
#[derive(Args, Clone, Default)]
pub struct LibraryArgs {
    /// Shared library to read exported symbols from
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Read exported symbols from a file, one per line
    #[arg(long, conflicts_with = "reader")]
    pub symbols_file: Option<PathBuf>,

    /// Symbol table reader
    #[arg(long, value_enum)]
    pub reader: Option<SymbolReaderKind>,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub library: LibraryArgs,

    /// Output file (overrides `output.path`)
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Fail if the output file is missing or out of date instead of writing it
    #[arg(long)]
    pub check: bool,
}

#[derive(Args)]
pub struct SymbolsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    #[command(flatten)]
    pub library: LibraryArgs,
}

#[derive(Args)]
pub struct SignaturesArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Exported names to resolve
    #[arg(required = true)]
    pub names: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
