//! StepGuide TUI — search the knowledge base and walk an article step by step.
//!
//! Three tabs (search, steps, summary) over one [`GuideSession`], built with
//! `ratatui` + `crossterm`. Logs go to `~/.stepguide/stepguide-tui.log`
//! because the terminal belongs to the UI.
//!
//! [`GuideSession`]: stepguide_core::GuideSession

mod app;
mod screens;
mod widgets;

use std::fs::OpenOptions;
use std::sync::Mutex;

use color_eyre::eyre::Result;
use stepguide_shared::config_dir;
use tracing_subscriber::EnvFilter;

const LOG_FILE: &str = "stepguide-tui.log";

fn main() -> Result<()> {
    color_eyre::install()?;
    // Without a log file the UI still runs, just unlogged
    let _ = init_tracing();
    app::run()
}

fn init_tracing() -> Result<()> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(LOG_FILE))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stepguide=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
