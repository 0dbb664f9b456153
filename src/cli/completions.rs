//! Shell completion generation

use std::io::Write;

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::cli::Cli;
use crate::error::Result;

/// Binary name completions are registered for
const BIN_NAME: &str = "sitediag";

/// Write the completion script for `shell` to stdout
pub fn run(shell: Shell) -> Result<()> {
    let mut stdout = std::io::stdout();
    write_completions(shell, &mut stdout)?;
    stdout.flush()?;
    Ok(())
}

fn write_completions(shell: Shell, out: &mut dyn Write) -> Result<()> {
    let mut command = Cli::command();
    generate(shell, &mut command, BIN_NAME, out);
    Ok(())
}
