#![deny(clippy::unwrap_used)]

mod build;
mod cache;
mod cmd;
mod common;
mod config;
mod lint;
mod pipelines;
mod processing;
mod rev;
mod serve;
mod watch;
mod ws;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use common::STARTING;
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Gantry::parse();

    tracing_subscriber::registry()
        // Filter spans based on the RUST_LOG env var.
        .with(eval_logging(&cli))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        // Install this registry as the global tracing registry.
        .try_init()
        .context("error initializing logging")?;

    tracing::info!(
        "{} Starting {} {}",
        STARTING,
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    cli.run().await
}

fn eval_logging(cli: &Gantry) -> tracing_subscriber::EnvFilter {
    let directives = match (cli.verbose, cli.quiet) {
        // quiet overrides verbose
        (_, true) => "error,gantry=warn",
        // increase verbosity
        (0, false) => "error,gantry=info",
        (1, false) => "error,gantry=debug",
        (_, false) => "error,gantry=trace",
    };
    tracing_subscriber::EnvFilter::new(directives)
}

/// Build, bundle & serve your web application's static assets.
#[derive(Parser)]
#[command(about, author, version)]
struct Gantry {
    #[command(subcommand)]
    action: Option<GantrySubcommands>,
    /// Path to the config file [default: gantry.json]
    #[arg(long, env = "GANTRY_CONFIG", global(true))]
    pub config: Option<PathBuf>,
    /// Enable verbose logging.
    #[arg(short, long, global(true), action=ArgAction::Count)]
    pub verbose: u8,
    /// Be more quiet, conflicts with --verbose
    #[arg(short, long, global(true), conflicts_with("verbose"))]
    pub quiet: bool,
}

impl Gantry {
    #[tracing::instrument(level = "trace", skip(self))]
    pub async fn run(self) -> Result<()> {
        // A bare invocation is the dev loop: watch & serve.
        let action = self
            .action
            .unwrap_or_else(|| GantrySubcommands::Serve(Default::default()));
        match action {
            GantrySubcommands::Build(inner) => inner.run(self.config).await,
            GantrySubcommands::Clean(inner) => inner.run(self.config).await,
            GantrySubcommands::Serve(inner) => inner.run(self.config).await,
            GantrySubcommands::Watch(inner) => inner.run(self.config).await,
        }
    }
}

#[derive(Subcommand)]
enum GantrySubcommands {
    /// Build all assets in release mode.
    Build(cmd::build::Build),
    /// Watch asset sources & rebuild on change.
    Watch(cmd::watch::Watch),
    /// Watch, rebuild & serve with live reload.
    Serve(cmd::serve::Serve),
    /// Clean output artifacts.
    Clean(cmd::clean::Clean),
}

#[cfg(test)]
mod tests {
    use crate::Gantry;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Gantry::command().debug_assert();
    }
}
