//! CLI command implementations for spyrun.
//!
//! Each submodule implements one subcommand:
//!
//! - [`run`] - Run a full sorting job against a raw binary recording
//! - [`params`] - Print the parameter schema with types and defaults
//! - [`check`] - Probe whether the external sorter binary is installed

pub mod check;
pub mod command;
pub mod common;
pub mod params;
pub mod run;
