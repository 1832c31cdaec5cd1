//! Per-job output workspace.
//!
//! Every sorting job owns one exclusive directory. All stages address
//! artifacts through the fixed relative paths defined here; nothing is
//! shared across jobs and no stage writes outside the workspace.

use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::Result;

/// Probe-description file written by the artifact generator.
const PROBE_FILE: &str = "probe.prb";
/// Binary sample data, written by the caller before setup begins.
const DATA_FILE: &str = "recording.dat";
/// Generated SpyKING CIRCUS config file.
const CONFIG_FILE: &str = "recording.params";
/// Results subdirectory produced by the tool itself.
const RESULTS_DIR: &str = "recording";
/// Launch script retained for debugging when requested.
const LAUNCH_SCRIPT: &str = "run_spyking_circus.sh";

/// The designated output directory for one sorting job.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Creates the workspace directory (and parents) and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the probe-description file.
    #[must_use]
    pub fn probe_file(&self) -> PathBuf {
        self.root.join(PROBE_FILE)
    }

    /// Path of the binary sample data the external tool is pointed at.
    #[must_use]
    pub fn data_file(&self) -> PathBuf {
        self.root.join(DATA_FILE)
    }

    /// Path of the generated config file.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Results subdirectory produced by the external tool.
    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_DIR)
    }

    /// Path the launch script is written to when script retention is enabled.
    #[must_use]
    pub fn launch_script(&self) -> PathBuf {
        self.root.join(LAUNCH_SCRIPT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_makes_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("job-0");
        assert!(!root.exists());
        let workspace = Workspace::create(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(workspace.root(), root);
    }

    #[test]
    fn test_fixed_relative_layout() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path()).unwrap();
        assert_eq!(workspace.probe_file(), dir.path().join("probe.prb"));
        assert_eq!(workspace.data_file(), dir.path().join("recording.dat"));
        assert_eq!(workspace.config_file(), dir.path().join("recording.params"));
        assert_eq!(workspace.results_dir(), dir.path().join("recording"));
    }

    #[test]
    fn test_create_is_reentrant_on_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        Workspace::create(dir.path()).unwrap();
        Workspace::create(dir.path()).unwrap();
    }
}
