//! Main application module for tabdeck.
//!
//! Loads settings, wires the registry and its collaborators together, and
//! runs the command console until `quit` or end of input.

pub mod actions;
mod state;

use actions::Command;
use state::{AppState, Outcome};

use std::io::{self, BufRead, Write};

use anyhow::Result;

use crate::settings::AppSettings;

/// Main entry point for the application.
pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = AppSettings::load();
    if settings.diagnostics {
        tabdeck_shared::diagnostics::set_enabled(true);
    }
    log::info!("starting tabdeck (profile '{}')", settings.profile);

    let state = AppState::new(settings)?;
    state.start()?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    prompt(&mut stdout)?;
    for line in stdin.lock().lines() {
        let line = line?;
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                prompt(&mut stdout)?;
                continue;
            }
            Err(e) => {
                writeln!(stdout, "error: {:#}", e)?;
                prompt(&mut stdout)?;
                continue;
            }
        };

        match state.execute(command) {
            Ok(Outcome::Continue(output)) => {
                if !output.is_empty() {
                    writeln!(stdout, "{}", output)?;
                }
            }
            Ok(Outcome::Quit) => break,
            Err(e) => writeln!(stdout, "error: {:#}", e)?,
        }
        prompt(&mut stdout)?;
    }

    state.shutdown()?;
    log::info!("bye");
    Ok(())
}

fn prompt(stdout: &mut io::Stdout) -> io::Result<()> {
    write!(stdout, "tabdeck> ")?;
    stdout.flush()
}
