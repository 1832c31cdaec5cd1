//! Common CLI options shared across commands.
//!
//! This module provides shared argument structures that can be composed into
//! command structs using `#[command(flatten)]`.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;

use spyrun_lib::recording::BinRecording;
use spyrun_lib::workspace::Workspace;

/// Options describing the input recording: raw binary samples plus an
/// explicit channel geometry.
#[derive(Debug, Clone, Args)]
pub struct RecordingOptions {
    /// Raw binary sample data (.dat)
    #[arg(short = 'd', long = "data")]
    pub data: PathBuf,

    /// Channel geometry file, one channel per line as 'x y' or 'x,y'
    #[arg(short = 'g', long = "geometry")]
    pub geometry: PathBuf,

    /// Sampling frequency in Hz
    #[arg(short = 's', long = "sample-rate")]
    pub sample_rate: f64,
}

impl RecordingOptions {
    /// Validates the input paths and builds the recording handle.
    ///
    /// # Errors
    ///
    /// Returns an error if either file is missing or the geometry does not
    /// parse.
    pub fn load(&self) -> anyhow::Result<BinRecording> {
        if !self.data.is_file() {
            bail!("Data file does not exist: {}", self.data.display());
        }
        if !self.geometry.is_file() {
            bail!("Geometry file does not exist: {}", self.geometry.display());
        }
        BinRecording::from_geometry_file(&self.data, self.sample_rate, &self.geometry)
            .with_context(|| format!("Failed to load geometry from {}", self.geometry.display()))
    }
}

/// Options locating the per-job workspace directory.
#[derive(Debug, Clone, Args)]
pub struct WorkspaceOptions {
    /// Workspace directory for this job (created if missing)
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

impl WorkspaceOptions {
    /// Creates the workspace directory, including parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(&self) -> anyhow::Result<Workspace> {
        Workspace::create(&self.output)
            .with_context(|| format!("Failed to create workspace {}", self.output.display()))
    }
}
