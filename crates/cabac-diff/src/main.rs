//! cabac-diff CLI - differential CABAC trace analyzer.

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "cabac_diff=debug"
    } else if cli.silent {
        "cabac_diff=error"
    } else {
        "cabac_diff=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(default_level.parse().unwrap()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = commands::cmd_compare(&cli);
    std::process::exit(exit_code);
}
