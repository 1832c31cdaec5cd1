//! The end-to-end sorting lifecycle.
//!
//! [`SpykingCircusSorter`] strings the stages together: validate overrides,
//! generate the on-disk artifacts, launch and supervise the external tool,
//! and bind a lazy result handle to the output directory. Each stage is
//! usable on its own through its module; this facade is the one-call path
//! pipelines use.

use log::info;

use crate::artifacts;
use crate::errors::{Result, SpyrunError};
use crate::params::{self, Overrides};
use crate::process::{ExitOutcome, ToolInvocation};
use crate::recording::Recording;
use crate::results::{self, SortingResult};
use crate::workspace::Workspace;

/// A configured SpyKING CIRCUS adapter.
#[derive(Debug, Clone, Default)]
pub struct SpykingCircusSorter {
    invocation: ToolInvocation,
}

impl SpykingCircusSorter {
    /// Creates a sorter that launches the default `spyking-circus` binary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a sorter that launches a specific binary (a bare name looked
    /// up on `PATH`, or an explicit path).
    #[must_use]
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self { invocation: ToolInvocation::new(binary) }
    }

    /// Retains the launch script in the workspace after each run.
    #[must_use]
    pub fn keep_launch_script(mut self, keep: bool) -> Self {
        self.invocation = self.invocation.keep_script(keep);
        self
    }

    /// Whether the configured binary can be found, as an explicit capability
    /// query. Callers should check this before submitting a job rather than
    /// treating a launch failure as the discovery mechanism.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.invocation.is_available()
    }

    /// The binary this sorter launches.
    #[must_use]
    pub fn binary(&self) -> &str {
        self.invocation.binary()
    }

    /// Runs the full sorting lifecycle against a prepared workspace.
    ///
    /// The recording's sample data must already live at the workspace's data
    /// path ([`Workspace::data_file`]); this function writes only the setup
    /// artifacts, never the samples.
    ///
    /// # Errors
    ///
    /// Any stage error propagates: schema violations from validation,
    /// [`SpyrunError::GeometryExport`] / [`SpyrunError::Template`] from
    /// artifact generation, [`SpyrunError::Launch`] if the tool cannot be
    /// started, and [`SpyrunError::ExternalToolFailure`] if it runs but
    /// exits non-zero. Result parsing is deferred: a successful return only
    /// means the tool reported success, not that its output is well-formed.
    pub fn sort(
        &self,
        recording: &dyn Recording,
        overrides: &Overrides,
        workspace: &Workspace,
    ) -> Result<SortingResult> {
        let params = params::validate(overrides)?;
        info!(
            "Sorting {} channels at {} Hz in {}",
            recording.num_channels(),
            recording.sampling_frequency(),
            workspace.root().display()
        );

        let resolved = artifacts::prepare(recording, &params, workspace)?;
        match self.invocation.run(workspace, &resolved)? {
            ExitOutcome::Success => Ok(results::collect(workspace)),
            ExitOutcome::Failed { exit_code } => {
                Err(SpyrunError::ExternalToolFailure { exit_code })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;

    #[test]
    fn test_default_sorter_targets_the_standard_binary() {
        let sorter = SpykingCircusSorter::new();
        assert_eq!(sorter.binary(), "spyking-circus");
    }

    #[test]
    fn test_with_binary_overrides_the_target() {
        let sorter = SpykingCircusSorter::with_binary("/opt/sc/bin/spyking-circus");
        assert_eq!(sorter.binary(), "/opt/sc/bin/spyking-circus");
        assert!(!sorter.is_available());
    }

    #[test]
    fn test_sort_rejects_bad_overrides_before_touching_the_tool() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path()).unwrap();
        let recording =
            crate::recording::BinRecording::new("rec.dat", 30000.0, vec![[0.0, 0.0]]).unwrap();

        let mut overrides = Overrides::new();
        overrides.insert("detect_singe".into(), ParamValue::Int(-1));

        let sorter = SpykingCircusSorter::with_binary("definitely-not-a-real-sorter-binary");
        let err = sorter.sort(&recording, &overrides, &workspace).unwrap_err();
        assert!(matches!(err, SpyrunError::UnknownOption { .. }));
        // Validation failed, so no artifacts were generated
        assert!(!workspace.probe_file().exists());
        assert!(!workspace.config_file().exists());
    }
}
