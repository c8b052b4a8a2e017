//! binpm CLI entry point
//!
//! Parses the command line, runs the command and renders errors with
//! suggestions. See [`binpm::cli`] for the available commands.

use anyhow::Result;
use binpm::cli;
use binpm::core::user_friendly_error;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}
