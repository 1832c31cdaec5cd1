//! External-process supervision.
//!
//! Builds the SpyKING CIRCUS command line for a prepared workspace, launches
//! it as a child process, blocks until it terminates, and classifies the
//! outcome. There are no retries, no timeout, and no cancellation: a job runs
//! to completion or failure, and a hung tool blocks the job indefinitely.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};

use crate::artifacts::ResolvedParams;
use crate::errors::{Result, SpyrunError};
use crate::logging::OperationTimer;
use crate::workspace::Workspace;

/// Name of the external binary, as installed by `pip install spyking-circus`.
pub const DEFAULT_BINARY: &str = "spyking-circus";

/// Classified outcome of one external-tool run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The tool exited with status 0
    Success,
    /// The tool exited with a non-zero status
    Failed {
        /// The raw exit code (-1 when the process was killed by a signal)
        exit_code: i32,
    },
}

impl ExitOutcome {
    /// Returns `true` for [`ExitOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }
}

/// One external-tool invocation: which binary to run and whether to retain
/// the launch script for debugging.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    binary: String,
    keep_script: bool,
}

impl Default for ToolInvocation {
    fn default() -> Self {
        Self::new(DEFAULT_BINARY)
    }
}

impl ToolInvocation {
    /// Creates an invocation of the given binary (a bare name looked up on
    /// `PATH`, or an explicit path).
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into(), keep_script: false }
    }

    /// Retains the launch script in the workspace after the run, for
    /// debugging failed jobs.
    #[must_use]
    pub fn keep_script(mut self, keep: bool) -> Self {
        self.keep_script = keep;
        self
    }

    /// The binary this invocation launches.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Whether the binary can be found, as an explicit capability query.
    ///
    /// A bare name is searched on `PATH`; anything containing a path
    /// separator is checked directly.
    #[must_use]
    pub fn is_available(&self) -> bool {
        find_binary(&self.binary).is_some()
    }

    /// The command line this invocation will run for the given workspace.
    #[must_use]
    pub fn command_line(&self, workspace: &Workspace, num_workers: usize) -> String {
        format!("{} {} -c {}", self.binary, workspace.data_file().display(), num_workers)
    }

    /// The launch-script text: the command line, with a shell header on
    /// unix-like platforms. There is no functional difference beyond the
    /// header; the script exists as a portable, re-runnable record of the
    /// exact invocation.
    #[must_use]
    pub fn script_text(&self, workspace: &Workspace, num_workers: usize) -> String {
        let command = self.command_line(workspace, num_workers);
        if cfg!(windows) {
            format!("{command}\r\n")
        } else {
            format!("#!/bin/bash\n{command}\n")
        }
    }

    /// Launches the tool against the workspace and blocks until it exits.
    ///
    /// The child runs with the caller's working directory and environment;
    /// whatever it writes lands inside the workspace by the tool's own
    /// convention. The launch script is written next to the artifacts and
    /// removed afterwards unless retention was requested.
    ///
    /// # Errors
    ///
    /// Returns [`SpyrunError::Launch`] if the process cannot be started at
    /// all (binary not found, permission denied). A non-zero exit is *not*
    /// an error here; it is reported as [`ExitOutcome::Failed`].
    pub fn run(&self, workspace: &Workspace, resolved: &ResolvedParams) -> Result<ExitOutcome> {
        let command_line = self.command_line(workspace, resolved.num_workers);
        let script_path = workspace.launch_script();
        fs::write(&script_path, self.script_text(workspace, resolved.num_workers))?;
        debug!("Launch script: {}", script_path.display());

        info!("Launching: {command_line}");
        let timer = OperationTimer::new("spyking-circus run");
        let status = Command::new(&self.binary)
            .arg(workspace.data_file())
            .arg("-c")
            .arg(resolved.num_workers.to_string())
            .status()
            .map_err(|source| SpyrunError::Launch { command: command_line.clone(), source })?;
        timer.log_done();

        if !self.keep_script {
            // Best-effort cleanup of the debug artifact
            let _ = fs::remove_file(&script_path);
        }

        match status.code() {
            Some(0) => Ok(ExitOutcome::Success),
            Some(exit_code) => Ok(ExitOutcome::Failed { exit_code }),
            // Killed by a signal before exiting
            None => Ok(ExitOutcome::Failed { exit_code: -1 }),
        }
    }
}

/// Resolves a binary name to a path, mirroring shell lookup: names with a
/// path separator are checked directly, bare names are searched on `PATH`.
fn find_binary(binary: &str) -> Option<PathBuf> {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        let path = Path::new(binary);
        return path.is_file().then(|| path.to_path_buf());
    }
    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(binary);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{binary}.exe"));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
