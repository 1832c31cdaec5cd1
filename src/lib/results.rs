//! Result materialization.
//!
//! [`collect`] binds a [`SortingResult`] to the workspace's results
//! subdirectory without touching the disk; the directory's contents are
//! parsed lazily on the first unit or spike-train query and cached after
//! that. The tool's export lives in two NPY arrays of equal length:
//! `spike_times.npy` (sample indices) and `spike_clusters.npy` (the unit
//! each spike belongs to).

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::errors::{Result, SpyrunError};
use crate::workspace::Workspace;

/// Spike sample indices, one per detected spike.
const SPIKE_TIMES_FILE: &str = "spike_times.npy";
/// Unit assignment, parallel to the spike times.
const SPIKE_CLUSTERS_FILE: &str = "spike_clusters.npy";

/// Binds a sorting result to the workspace's results subdirectory.
///
/// Performs no validation beyond remembering the path; only call this after
/// the supervisor reported success.
#[must_use]
pub fn collect(workspace: &Workspace) -> SortingResult {
    SortingResult::new(workspace.results_dir())
}

/// The uniform sorting-result abstraction: detected units and their spike
/// trains, parsed lazily from the tool's output directory.
#[derive(Debug)]
pub struct SortingResult {
    results_dir: PathBuf,
    units: OnceLock<BTreeMap<i64, Vec<i64>>>,
}

impl SortingResult {
    /// Binds a result to a directory without reading it.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(results_dir: P) -> Self {
        Self { results_dir: results_dir.into(), units: OnceLock::new() }
    }

    /// The directory this result reads from.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// The detected unit ids, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`SpyrunError::ResultParse`] if the results directory is
    /// missing or its spike data is malformed.
    pub fn unit_ids(&self) -> Result<Vec<i64>> {
        Ok(self.load()?.keys().copied().collect())
    }

    /// The spike train (sample indices, in file order) of one unit.
    ///
    /// # Errors
    ///
    /// Returns [`SpyrunError::ResultParse`] if the results directory is
    /// missing or malformed, or if the unit id is unknown.
    pub fn spike_train(&self, unit_id: i64) -> Result<&[i64]> {
        self.load()?.get(&unit_id).map(Vec::as_slice).ok_or_else(|| SpyrunError::ResultParse {
            path: self.results_dir.display().to_string(),
            reason: format!("no unit with id {unit_id}"),
        })
    }

    /// Total number of spikes across all units.
    ///
    /// # Errors
    ///
    /// Same conditions as [`SortingResult::unit_ids`].
    pub fn num_spikes(&self) -> Result<usize> {
        Ok(self.load()?.values().map(Vec::len).sum())
    }

    fn load(&self) -> Result<&BTreeMap<i64, Vec<i64>>> {
        if let Some(units) = self.units.get() {
            return Ok(units);
        }
        let units = self.parse()?;
        Ok(self.units.get_or_init(|| units))
    }

    fn parse(&self) -> Result<BTreeMap<i64, Vec<i64>>> {
        if !self.results_dir.is_dir() {
            return Err(SpyrunError::ResultParse {
                path: self.results_dir.display().to_string(),
                reason: "results directory does not exist".to_string(),
            });
        }
        let times = read_npy_1d_ints(&self.results_dir.join(SPIKE_TIMES_FILE))?;
        let clusters = read_npy_1d_ints(&self.results_dir.join(SPIKE_CLUSTERS_FILE))?;
        if times.len() != clusters.len() {
            return Err(SpyrunError::ResultParse {
                path: self.results_dir.display().to_string(),
                reason: format!(
                    "{SPIKE_TIMES_FILE} has {} entries but {SPIKE_CLUSTERS_FILE} has {}",
                    times.len(),
                    clusters.len()
                ),
            });
        }

        let mut units: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (time, cluster) in times.into_iter().zip(clusters) {
            units.entry(cluster).or_default().push(time);
        }
        Ok(units)
    }
}

/// Reads a 1-D little-endian integer NPY array (format versions 1.0/2.0).
///
/// Supports the dtypes the tool exports: `<i8`, `<u8`, `<i4`, `<u4`. A
/// trailing dimension of 1 (shape `(n, 1)`) is accepted and flattened.
fn read_npy_1d_ints(path: &Path) -> Result<Vec<i64>> {
    let parse_err = |reason: String| SpyrunError::ResultParse {
        path: path.display().to_string(),
        reason,
    };

    let bytes = fs::read(path)
        .map_err(|e| parse_err(format!("cannot read file: {e}")))?;
    if bytes.len() < 10 || &bytes[..6] != b"\x93NUMPY" {
        return Err(parse_err("not an NPY file (bad magic)".to_string()));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 => {
            if bytes.len() < 12 {
                return Err(parse_err("truncated NPY header".to_string()));
            }
            let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
            (len, 12)
        }
        other => return Err(parse_err(format!("unsupported NPY version {other}"))),
    };
    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(parse_err("truncated NPY header".to_string()));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| parse_err("NPY header is not valid UTF-8".to_string()))?;

    let descr = header_field(header, "descr")
        .ok_or_else(|| parse_err("NPY header has no 'descr' field".to_string()))?;
    let elem_size = match descr {
        "<i8" | "<u8" => 8,
        "<i4" | "<u4" => 4,
        other => return Err(parse_err(format!("unsupported NPY dtype '{other}'"))),
    };
    if header.contains("'fortran_order': True") {
        return Err(parse_err("fortran-ordered NPY arrays are not supported".to_string()));
    }
    let count = parse_1d_shape(header)
        .ok_or_else(|| parse_err(format!("expected a 1-D shape in NPY header: {header}")))?;

    let data = &bytes[data_start..];
    // A malformed shape can claim more elements than any file could hold;
    // the byte length must be computed without overflow before trusting it.
    let byte_len = count
        .checked_mul(elem_size)
        .filter(|len| *len <= data.len())
        .ok_or_else(|| {
            parse_err(format!(
                "expected {count} elements of {elem_size} bytes, found {} data bytes",
                data.len()
            ))
        })?;

    let mut values = Vec::with_capacity(count);
    for chunk in data[..byte_len].chunks_exact(elem_size) {
        let value = match descr {
            "<i8" => i64::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ]),
            "<u8" => u64::from_le_bytes([
                chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
            ]) as i64,
            "<i4" => i64::from(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            "<u4" => i64::from(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
            _ => unreachable!("dtype checked above"),
        };
        values.push(value);
    }
    Ok(values)
}

/// Extracts a quoted header field value, e.g. `'descr': '<i8'` → `<i8`.
fn header_field<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let key = format!("'{name}':");
    let after = &header[header.find(&key)? + key.len()..];
    let open = after.find('\'')?;
    let rest = &after[open + 1..];
    let close = rest.find('\'')?;
    Some(&rest[..close])
}

/// Parses the element count out of a 1-D shape tuple: `(n,)` or `(n, 1)`.
fn parse_1d_shape(header: &str) -> Option<usize> {
    let after = &header[header.find("'shape':")? + "'shape':".len()..];
    let open = after.find('(')?;
    let close = after.find(')')?;
    let dims: Vec<&str> = after[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .collect();
    match dims.as_slice() {
        [n] => n.parse().ok(),
        [n, one] if *one == "1" => n.parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serializes a 1-D `<i8` array in NPY v1.0 format.
    pub(crate) fn npy_i64(values: &[i64]) -> Vec<u8> {
        let header = format!(
            "{{'descr': '<i8', 'fortran_order': False, 'shape': ({},), }}",
            values.len()
        );
        let mut header = header.into_bytes();
        // Pad so magic + version + length + header is a multiple of 16
        while (10 + header.len() + 1) % 16 != 0 {
            header.push(b' ');
        }
        header.push(b'\n');

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"\x93NUMPY");
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&header);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    fn npy_u32(values: &[u32]) -> Vec<u8> {
        let header = format!(
            "{{'descr': '<u4', 'fortran_order': False, 'shape': ({},), }}",
            values.len()
        );
        let mut header = header.into_bytes();
        while (10 + header.len() + 1) % 16 != 0 {
            header.push(b' ');
        }
        header.push(b'\n');

        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"\x93NUMPY");
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(&header);
        for v in values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    fn write_results(dir: &Path, times: &[i64], clusters: &[i64]) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(SPIKE_TIMES_FILE), npy_i64(times)).unwrap();
        fs::write(dir.join(SPIKE_CLUSTERS_FILE), npy_i64(clusters)).unwrap();
    }

    #[test]
    fn test_npy_roundtrip_i64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        fs::write(&path, npy_i64(&[5, -3, 1_000_000_000_000])).unwrap();
        assert_eq!(read_npy_1d_ints(&path).unwrap(), vec![5, -3, 1_000_000_000_000]);
    }

    #[test]
    fn test_npy_reads_u32_dtype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        fs::write(&path, npy_u32(&[0, 7, u32::MAX])).unwrap();
        assert_eq!(read_npy_1d_ints(&path).unwrap(), vec![0, 7, i64::from(u32::MAX)]);
    }

    #[test]
    fn test_npy_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        fs::write(&path, b"not an npy file at all").unwrap();
        let err = read_npy_1d_ints(&path).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_npy_rejects_unsupported_dtype() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        let mut bytes = npy_i64(&[1]);
        // Corrupt the dtype in place
        let pos = bytes.windows(3).position(|w| w == b"<i8").unwrap();
        bytes[pos..pos + 3].copy_from_slice(b"<f8");
        fs::write(&path, bytes).unwrap();
        let err = read_npy_1d_ints(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported NPY dtype"));
    }

    #[test]
    fn test_npy_rejects_shape_larger_than_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.npy");
        // Header claims 2^61 8-byte elements but carries no data at all;
        // the byte-length computation must not wrap
        let header = "{'descr': '<i8', 'fortran_order': False, 'shape': (2305843009213693952,), }\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"\x93NUMPY");
        bytes.extend_from_slice(&[1, 0]);
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        fs::write(&path, bytes).unwrap();

        let err = read_npy_1d_ints(&path).unwrap_err();
        assert!(matches!(err, SpyrunError::ResultParse { .. }));
        assert!(err.to_string().contains("0 data bytes"));
    }

    #[test]
    fn test_collect_is_lazy_failure_surfaces_on_first_query() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path()).unwrap();

        // No `recording/` subdirectory: collect itself must not fail
        let result = collect(&workspace);
        assert_eq!(result.results_dir(), workspace.results_dir());

        let err = result.unit_ids().unwrap_err();
        assert!(matches!(err, SpyrunError::ResultParse { .. }));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_units_grouped_by_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path()).unwrap();
        write_results(&workspace.results_dir(), &[10, 25, 40, 55, 70], &[2, 0, 2, 0, 2]);

        let result = collect(&workspace);
        assert_eq!(result.unit_ids().unwrap(), vec![0, 2]);
        assert_eq!(result.spike_train(0).unwrap(), [25, 55]);
        assert_eq!(result.spike_train(2).unwrap(), [10, 40, 70]);
        assert_eq!(result.num_spikes().unwrap(), 5);
    }

    #[test]
    fn test_unknown_unit_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path()).unwrap();
        write_results(&workspace.results_dir(), &[10], &[1]);

        let result = collect(&workspace);
        let err = result.spike_train(9).unwrap_err();
        assert!(err.to_string().contains("no unit with id 9"));
    }

    #[test]
    fn test_length_mismatch_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::create(dir.path()).unwrap();
        let results = workspace.results_dir();
        fs::create_dir_all(&results).unwrap();
        fs::write(results.join(SPIKE_TIMES_FILE), npy_i64(&[1, 2, 3])).unwrap();
        fs::write(results.join(SPIKE_CLUSTERS_FILE), npy_i64(&[0])).unwrap();

        let err = collect(&workspace).unit_ids().unwrap_err();
        assert!(err.to_string().contains("3 entries"));
    }
}
