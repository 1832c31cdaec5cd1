//! Probe whether the external sorter binary is installed.

use anyhow::{Result, bail};
use clap::Parser;

use spyrun_lib::process::DEFAULT_BINARY;
use spyrun_lib::sorter::SpykingCircusSorter;

use crate::commands::command::Command;

/// Check that the external sorter binary can be found.
///
/// Exits zero when the binary is on PATH (or at the given path), non-zero
/// otherwise, so the check is usable from pipeline scripts.
#[derive(Debug, Parser)]
#[command(name = "check", about = "Check that the spyking-circus binary is installed")]
pub struct Check {
    /// External sorter binary to look for
    #[arg(long = "binary", default_value = DEFAULT_BINARY)]
    pub binary: String,
}

impl Command for Check {
    fn execute(&self) -> Result<()> {
        let sorter = SpykingCircusSorter::with_binary(&self.binary);
        if sorter.is_available() {
            println!("{} is available", self.binary);
            Ok(())
        } else if self.binary == DEFAULT_BINARY {
            bail!(
                "SpyKING CIRCUS is not installed. Install it with 'pip install \
                 spyking-circus' (an MPI implementation such as MPICH must be \
                 installed first)."
            );
        } else {
            bail!("Sorter binary not found: {}", self.binary);
        }
    }
}
