//! Print the parameter schema.

use anyhow::Result;
use clap::Parser;

use spyrun_lib::params::SCHEMA;

use crate::commands::command::Command;

/// Print the recognized parameters with their types and defaults.
#[derive(Debug, Parser)]
#[command(
    name = "params",
    about = "Print the recognized parameters, their types, and their defaults"
)]
pub struct Params {
    /// Emit the schema as JSON instead of a table
    #[arg(long = "json")]
    pub json: bool,
}

impl Command for Params {
    fn execute(&self) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(SCHEMA)?);
            return Ok(());
        }

        let name_width = SCHEMA.iter().map(|s| s.name.len()).max().unwrap_or(0);
        for spec in SCHEMA {
            println!(
                "{:name_width$}  {:12} default: {:8} {}",
                spec.name,
                spec.kind.to_string(),
                spec.default.to_string(),
                spec.description,
            );
        }
        Ok(())
    }
}
