//! Run a full sorting job against a raw binary recording.
//!
//! Stages the sample data into the workspace, generates the sorter's
//! artifacts, launches the external tool, and prints a per-unit summary of
//! the output. Parameters come from an optional JSON override file plus
//! individual flags; flags win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;

use spyrun_lib::params::{Overrides, ParamValue};
use spyrun_lib::process::DEFAULT_BINARY;
use spyrun_lib::sorter::SpykingCircusSorter;

use crate::commands::command::Command;
use crate::commands::common::{RecordingOptions, WorkspaceOptions};

/// Shown when the external sorter cannot be found.
const INSTALL_HINT: &str =
    "SpyKING CIRCUS is not installed. Install it with 'pip install spyking-circus' \
     (an MPI implementation such as MPICH must be installed first).";

/// Run the SpyKING CIRCUS spike sorter on a recording.
///
/// Validates parameters, writes the probe and config files into the
/// workspace, launches the external tool, and summarizes the detected units.
#[derive(Debug, Parser)]
#[command(
    name = "run",
    about = "Run the SpyKING CIRCUS spike sorter on a raw binary recording",
    long_about = r#"
Run a full sorting job: stage the recording into the workspace, generate the
probe and config files, launch the external spyking-circus binary, and
summarize the detected units.

Parameters default to the built-in schema (see 'spyrun params'). Override
them with a JSON file (--params) and/or individual flags; flags take
precedence over the file.

EXAMPLES:

  # Sort with defaults
  spyrun run -d recording.dat -g geometry.csv -s 30000 -o job/

  # Lower the detection threshold and pin the worker count
  spyrun run -d recording.dat -g geometry.csv -s 30000 -o job/ \
    --detect-threshold 4.5 --num-workers 8

  # Load overrides from a file, keep the launch script for debugging
  spyrun run -d recording.dat -g geometry.csv -s 30000 -o job/ \
    --params overrides.json --keep-launch-script
"#
)]
pub struct Run {
    #[command(flatten)]
    pub recording: RecordingOptions,

    #[command(flatten)]
    pub workspace: WorkspaceOptions,

    /// JSON file of parameter overrides, e.g. {"detect_threshold": 4.5}
    #[arg(short = 'p', long = "params")]
    pub params: Option<PathBuf>,

    /// Sign of the spikes to detect: -1, 0 (both), or 1
    #[arg(long = "detect-sign")]
    pub detect_sign: Option<i64>,

    /// Adjacency radius in microns
    #[arg(long = "adjacency-radius")]
    pub adjacency_radius: Option<f64>,

    /// Detection threshold
    #[arg(long = "detect-threshold")]
    pub detect_threshold: Option<f64>,

    /// Template width in milliseconds
    #[arg(long = "template-width-ms")]
    pub template_width_ms: Option<f64>,

    /// Whether to filter the recording
    #[arg(long = "filter", value_name = "BOOL")]
    pub filter: Option<bool>,

    /// Whether to merge spikes at the end
    #[arg(long = "merge-spikes", value_name = "BOOL")]
    pub merge_spikes: Option<bool>,

    /// Auto-merge similarity threshold
    #[arg(long = "auto-merge")]
    pub auto_merge: Option<f64>,

    /// Number of parallel workers (derived from the CPU count when unset)
    #[arg(long = "num-workers")]
    pub num_workers: Option<i64>,

    /// Max events subsampled during whitening
    #[arg(long = "whitening-max-elts")]
    pub whitening_max_elts: Option<i64>,

    /// Max events subsampled during clustering
    #[arg(long = "clustering-max-elts")]
    pub clustering_max_elts: Option<i64>,

    /// External sorter binary to launch
    #[arg(long = "binary", default_value = DEFAULT_BINARY)]
    pub binary: String,

    /// Keep the launch script in the workspace after the run
    #[arg(long = "keep-launch-script")]
    pub keep_launch_script: bool,
}

impl Run {
    /// Merges the JSON override file (if any) with the individual flags.
    fn overrides(&self) -> Result<Overrides> {
        let mut overrides = match &self.params {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse {} as overrides", path.display()))?
            }
            None => Overrides::new(),
        };

        if let Some(v) = self.detect_sign {
            overrides.insert("detect_sign".into(), ParamValue::Int(v));
        }
        if let Some(v) = self.adjacency_radius {
            overrides.insert("adjacency_radius".into(), ParamValue::Float(v));
        }
        if let Some(v) = self.detect_threshold {
            overrides.insert("detect_threshold".into(), ParamValue::Float(v));
        }
        if let Some(v) = self.template_width_ms {
            overrides.insert("template_width_ms".into(), ParamValue::Float(v));
        }
        if let Some(v) = self.filter {
            overrides.insert("filter".into(), ParamValue::Bool(v));
        }
        if let Some(v) = self.merge_spikes {
            overrides.insert("merge_spikes".into(), ParamValue::Bool(v));
        }
        if let Some(v) = self.auto_merge {
            overrides.insert("auto_merge".into(), ParamValue::Float(v));
        }
        if let Some(v) = self.num_workers {
            overrides.insert("num_workers".into(), ParamValue::Int(v));
        }
        if let Some(v) = self.whitening_max_elts {
            overrides.insert("whitening_max_elts".into(), ParamValue::Int(v));
        }
        if let Some(v) = self.clustering_max_elts {
            overrides.insert("clustering_max_elts".into(), ParamValue::Int(v));
        }
        Ok(overrides)
    }
}

/// True when both paths resolve to the same existing file. Textual equality
/// is not enough: copying a file onto itself truncates it, so differently
/// spelled paths to the same data file must be caught before staging.
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        // Either path missing: nothing to truncate, a plain copy is safe
        _ => false,
    }
}

impl Command for Run {
    fn execute(&self) -> Result<()> {
        let sorter = SpykingCircusSorter::with_binary(&self.binary)
            .keep_launch_script(self.keep_launch_script);
        if !sorter.is_available() {
            if self.binary == DEFAULT_BINARY {
                bail!("{INSTALL_HINT}");
            }
            bail!("Sorter binary not found: {}", self.binary);
        }

        let recording = self.recording.load()?;
        let overrides = self.overrides()?;
        let workspace = self.workspace.create()?;

        // The tool expects the samples at the workspace's fixed data path
        let staged = workspace.data_file();
        if !is_same_file(&self.recording.data, &staged) {
            fs::copy(&self.recording.data, &staged).with_context(|| {
                format!("Failed to stage {} into the workspace", self.recording.data.display())
            })?;
            info!("Staged sample data at {}", staged.display());
        }

        let result = sorter.sort(&recording, &overrides, &workspace)?;
        let unit_ids = result.unit_ids()?;
        info!("Sorting finished: {} units, {} spikes", unit_ids.len(), result.num_spikes()?);
        for unit in unit_ids {
            info!("  unit {unit}: {} spikes", result.spike_train(unit)?.len());
        }
        Ok(())
    }
}
