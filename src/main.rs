mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod resource;
mod transport;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

use crate::config::ConnectionConfig;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    /// Manifest given with the global --manifest flag
    pub manifest: Option<String>,
    /// Connection settings from the command line and environment
    pub connection: ConnectionConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        manifest: cli.manifest,
        connection: cli.connection.to_config(),
    };

    match cli.command {
        Command::Sync(args) => commands::sync::run(&ctx, &args),
        Command::Apply(args) => commands::apply::run(&ctx, &args),
        Command::List(args) => commands::list::run(&ctx, args.kind.as_str()),
        Command::Kinds => {
            commands::list::kinds(&ctx);
            Ok(())
        }
        Command::Completions { shell } => {
            generate(shell, &mut Cli::command(), "opnsync", &mut io::stdout());
            Ok(())
        }
    }
}
