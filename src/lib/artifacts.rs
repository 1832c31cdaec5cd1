//! Artifact generation: probe file, config file, and worker resolution.
//!
//! [`prepare`] turns a recording handle plus a validated parameter set into
//! the two on-disk artifacts SpyKING CIRCUS needs, and resolves the runtime
//! defaults the caller left unset. It is the only stage allowed to write
//! setup artifacts into the workspace; later stages only read them.

use std::fs;
use std::thread;

use log::{debug, info};

use crate::errors::Result;
use crate::params::ParameterSet;
use crate::recording::Recording;
use crate::template::{Binding, ConfigTemplate, DEFAULT_TEMPLATE};
use crate::workspace::Workspace;

/// A parameter set with the worker count pinned to a concrete value.
///
/// Produced by [`resolve`]; the input [`ParameterSet`] is never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParams {
    /// The validated parameters, with `num_workers` filled in
    pub params: ParameterSet,
    /// Concrete worker count passed to the tool's `-c` flag. Never 0.
    pub num_workers: usize,
}

/// Maps the signed `detect_sign` parameter onto the tool's three-valued
/// detection token: negative polarity, positive polarity, or both.
#[must_use]
pub fn detect_sign_token(detect_sign: i64) -> &'static str {
    if detect_sign < 0 {
        "negative"
    } else if detect_sign > 0 {
        "positive"
    } else {
        "both"
    }
}

/// Resolves the worker count against the host CPU count.
///
/// An explicit `num_workers` is kept as-is; an unset one becomes
/// `max(1, logical_cpus / 2)`, so a single-CPU host still gets one worker.
#[must_use]
pub fn resolve(params: &ParameterSet, logical_cpus: usize) -> ResolvedParams {
    let num_workers = params.num_workers.unwrap_or_else(|| (logical_cpus / 2).max(1));
    let mut resolved = params.clone();
    resolved.num_workers = Some(num_workers);
    ResolvedParams { params: resolved, num_workers }
}

/// Writes the probe file and the populated config file into the workspace,
/// then resolves the worker count.
///
/// The probe export always treats the whole recording as one ungrouped
/// channel group; multi-group fan-out is the caller's concern.
///
/// # Errors
///
/// Returns [`SpyrunError::GeometryExport`](crate::errors::SpyrunError) if
/// the recording cannot produce a probe file,
/// [`SpyrunError::Template`](crate::errors::SpyrunError) if the template and
/// its bindings disagree, and I/O errors from writing either artifact.
pub fn prepare(
    recording: &dyn Recording,
    params: &ParameterSet,
    workspace: &Workspace,
) -> Result<ResolvedParams> {
    let probe_file = workspace.probe_file();
    recording.write_probe_file(&probe_file, params.adjacency_radius)?;
    info!(
        "Wrote probe file for {} channels: {}",
        recording.num_channels(),
        probe_file.display()
    );

    // Merging disabled renders a literal 0 threshold, whatever auto_merge says
    let merge_threshold = if params.merge_spikes { params.auto_merge } else { 0.0 };
    let template = ConfigTemplate::parse(DEFAULT_TEMPLATE)?;
    let config = template.render(&[
        Binding::float("sample_rate", recording.sampling_frequency()),
        Binding::text("probe_file", probe_file.display().to_string()),
        Binding::float("template_width_ms", params.template_width_ms),
        Binding::float("detect_threshold", params.detect_threshold),
        Binding::text("detect_sign", detect_sign_token(params.detect_sign)),
        Binding::bool("filter", params.filter),
        Binding::int("whitening_max_elts", params.whitening_max_elts),
        Binding::int("clustering_max_elts", params.clustering_max_elts),
        Binding::float("auto_merge", merge_threshold),
    ])?;
    fs::write(workspace.config_file(), config)?;
    debug!("Wrote config file: {}", workspace.config_file().display());

    let logical_cpus = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let resolved = resolve(params, logical_cpus);
    info!("Resolved worker count: {}", resolved.num_workers);
    Ok(resolved)
}
