#![deny(unsafe_code)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

//! # spyrun - SpyKING CIRCUS adapter library
//!
//! This library drives the SpyKING CIRCUS spike sorter as an external tool:
//! it validates run parameters, generates the on-disk artifacts the sorter
//! expects, supervises the subprocess, and materializes the sorted output as
//! a uniform result handle.
//!
//! ## Overview
//!
//! The sorting lifecycle runs through four stages, one module each:
//!
//! - **[`params`]** - Parameter schema, defaults, and override validation
//! - **[`artifacts`]** - Probe-file and config-file generation, worker resolution
//! - **[`process`]** - Subprocess launch, supervision, and exit classification
//! - **[`results`]** - Lazy parsing of the sorter's output directory
//!
//! Supporting modules:
//!
//! - **[`recording`]** - The minimal recording abstraction and the raw-binary handle
//! - **[`template`]** - Typed, order-checked config-template binding
//! - **[`workspace`]** - The per-job directory layout
//! - **[`sorter`]** - The one-call facade over the whole lifecycle
//! - **[`errors`]** - The crate-wide error type
//! - **[`logging`]** - Duration formatting and operation timing
//!
//! ## Quick Start
//!
//! ```no_run
//! use spyrun_lib::params::Overrides;
//! use spyrun_lib::recording::BinRecording;
//! use spyrun_lib::sorter::SpykingCircusSorter;
//! use spyrun_lib::workspace::Workspace;
//!
//! # fn main() -> spyrun_lib::errors::Result<()> {
//! let recording = BinRecording::new(
//!     "recording.dat",
//!     30_000.0,
//!     vec![[0.0, 0.0], [0.0, 20.0], [20.0, 0.0], [20.0, 20.0]],
//! )?;
//! let workspace = Workspace::create("job")?;
//!
//! let sorter = SpykingCircusSorter::new();
//! let result = sorter.sort(&recording, &Overrides::new(), &workspace)?;
//! for unit in result.unit_ids()? {
//!     println!("unit {unit}: {} spikes", result.spike_train(unit)?.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifacts;
pub mod errors;
pub mod logging;
pub mod params;
pub mod process;
pub mod recording;
pub mod results;
pub mod sorter;
pub mod template;
pub mod workspace;

pub use errors::{Result, SpyrunError};
pub use sorter::SpykingCircusSorter;
