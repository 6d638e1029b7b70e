// src/bin/atlasman.rs

use anyhow::Result;
use atlasman::{
    cli::{self, Cli, dispatcher, handlers::commons::Session},
    core::prompter::PromptError,
};
use clap::Parser;
use colored::*;
use std::env;

/// The main entry point of the `atlasman` application.
/// It sets up logging, parses arguments, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run_cli(cli) {
        // --- Centralized Error Handling ---
        // Sub-command parse errors and `--help` are rendered by clap itself.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }

        // A prompt the user backed out of exits like an interrupted shell command.
        let interrupted = e
            .chain()
            .filter_map(|cause| cause.downcast_ref::<PromptError>())
            .any(PromptError::is_interruption);
        if interrupted {
            std::process::exit(130);
        }

        eprintln!("\n{}: {}", "Error".red().bold(), cli::render_error(&e));
        std::process::exit(1);
    }
}

/// Installs `env_logger`. Warnings only by default; `RUST_LOG` wins when set, and
/// `--verbose` raises atlasman's own logs to debug.
fn init_logging(verbose: bool) {
    let from_env = env::var_os("RUST_LOG").is_some();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn,atlasman=debug"))
        .format_timestamp(None)
        .init();

    if !from_env {
        // The filter admits debug records so `cli.verbose` can raise the level later.
        let level = if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        };
        log::set_max_level(level);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);
    let mut session = Session::from_environment()?;
    dispatcher::dispatch(cli.args, &mut session)
}
