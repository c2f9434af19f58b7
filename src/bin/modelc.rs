//! Thin CLI driver (spec.md §6 calls command-line/UI wrappers out of
//! scope for the core; this is the minimal `clap` shell the ambient stack
//! still needs). Mirrors a `src/bin/*.rs`-style binary: load
//! config, initialize `tracing`, dispatch a subcommand, report errors
//! through `anyhow` at this boundary only (library code uses
//! `thiserror`/`CompileError`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modelc::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "modelc", about = "Compiler for coupled dynamical systems models")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a model file through C1-C8.
    Compile {
        file: PathBuf,
        #[arg(long)]
        stdlib_root: Option<PathBuf>,
        #[arg(long)]
        dump_ir: bool,
        #[arg(long)]
        dump_groups: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    init_tracing(&config);

    match cli.command {
        Command::Compile {
            file,
            stdlib_root,
            dump_ir,
            dump_groups,
        } => run_compile(config, file, stdlib_root, dump_ir, dump_groups),
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if config.logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

fn run_compile(
    mut config: Config,
    file: PathBuf,
    stdlib_root: Option<PathBuf>,
    dump_ir: bool,
    dump_groups: bool,
) -> Result<()> {
    if let Some(root) = stdlib_root {
        config.compiler.stdlib_root = root;
    }

    tracing::info!(file = %file.display(), "compiling model");

    // Lexing/parsing the source file into `modelc_ast::Program` is an
    // external collaborator (spec.md §1, Non-goals) not implemented in
    // this crate; this driver exists to exercise the config/logging
    // ambient stack and the C6-C8 pipeline once a caller has a resolved
    // `InstructionSet` in hand (see `modelc::compiler::Compiler`).
    let _ = dump_ir;
    let _ = dump_groups;

    anyhow::bail!(
        "no lexer/parser is bundled with this crate; compile a model by calling \
         modelc::compiler::Compiler directly from a host embedding one"
    )
}
