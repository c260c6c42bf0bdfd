//! StepGuide CLI — guided knowledge-base troubleshooting in the terminal.
//!
//! Finds the right support article for a problem description and walks the
//! agent through it one step at a time, rerouting to fallback procedures
//! when a step fails.

mod commands;
mod guide;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
