mod cli;
mod commands;
mod config;
mod prompt;
mod runner;
mod storage;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::Result;
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point: parse flags, resolve file locations, dispatch.
#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = color_eyre::install() {
        eprintln!("failed to install error reporter: {err}");
    }

    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: cli::Cli) -> Result<i32> {
    let settings = config::load()?;
    let paths = config::resolve(&settings)?;
    commands::handle(cli, &settings, &paths).await
}

fn init_tracing(verbose: bool) {
    // Respect user-provided filters; keep quiet by default so child output stays clean.
    let default = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
