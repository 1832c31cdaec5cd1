//! Recording handle and probe-geometry export.
//!
//! The core never inspects raw sample data; it only needs the sampling
//! frequency, the channel count, and the ability to serialize the channel
//! geometry to a SpyKING CIRCUS probe file. [`Recording`] is that minimal
//! seam, and [`BinRecording`] is the concrete handle the CLI drives jobs
//! with: a raw binary `.dat` file plus a channel-geometry table.
//!
//! Probe export always writes a single channel group. Splitting a multi-group
//! recording into one job per group happens one level up, in the caller.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::errors::{Result, SpyrunError};

/// Minimal recording abstraction consumed by the sorting lifecycle.
pub trait Recording {
    /// Sampling frequency in Hz. Always positive.
    fn sampling_frequency(&self) -> f64;

    /// Number of channels in the recording.
    fn num_channels(&self) -> usize;

    /// Serializes the channel geometry to a probe-description file,
    /// using `radius` as the channel-neighborhood adjacency radius.
    ///
    /// # Errors
    ///
    /// Returns [`SpyrunError::GeometryExport`] if the geometry cannot be
    /// serialized (e.g. non-finite channel positions).
    fn write_probe_file(&self, path: &Path, radius: f64) -> Result<()>;
}

/// A recording stored as raw binary samples plus an explicit channel geometry.
#[derive(Debug, Clone)]
pub struct BinRecording {
    data_path: PathBuf,
    sampling_frequency: f64,
    channel_positions: Vec<[f64; 2]>,
}

impl BinRecording {
    /// Creates a recording handle from explicit channel positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the sampling frequency is not positive or the
    /// geometry is empty.
    pub fn new<P: Into<PathBuf>>(
        data_path: P,
        sampling_frequency: f64,
        channel_positions: Vec<[f64; 2]>,
    ) -> Result<Self> {
        let data_path = data_path.into();
        if sampling_frequency <= 0.0 || !sampling_frequency.is_finite() {
            return Err(SpyrunError::GeometryExport {
                path: data_path.display().to_string(),
                reason: format!("sampling frequency must be positive, got {sampling_frequency}"),
            });
        }
        if channel_positions.is_empty() {
            return Err(SpyrunError::GeometryExport {
                path: data_path.display().to_string(),
                reason: "recording has no channels".to_string(),
            });
        }
        Ok(Self { data_path, sampling_frequency, channel_positions })
    }

    /// Loads channel positions from a geometry file and builds a handle.
    ///
    /// The geometry file holds one channel per line as `x y` or `x,y`;
    /// blank lines and lines starting with `#` are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a line does not parse
    /// as two coordinates.
    pub fn from_geometry_file<P: Into<PathBuf>, Q: AsRef<Path>>(
        data_path: P,
        sampling_frequency: f64,
        geometry_path: Q,
    ) -> Result<Self> {
        let geometry_path = geometry_path.as_ref();
        let text = fs::read_to_string(geometry_path)?;
        let mut positions = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            positions.push(parse_position(line).ok_or_else(|| SpyrunError::GeometryExport {
                path: geometry_path.display().to_string(),
                reason: format!("line {}: expected 'x y' or 'x,y', got '{line}'", line_no + 1),
            })?);
        }
        Self::new(data_path, sampling_frequency, positions)
    }

    /// Path of the raw binary sample data.
    #[must_use]
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Channel positions in recording order.
    #[must_use]
    pub fn channel_positions(&self) -> &[[f64; 2]] {
        &self.channel_positions
    }
}

fn parse_position(line: &str) -> Option<[f64; 2]> {
    let mut fields = line.split(|c: char| c == ',' || c.is_whitespace()).filter(|f| !f.is_empty());
    let x = fields.next()?.parse().ok()?;
    let y = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some([x, y])
}

impl Recording for BinRecording {
    fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn num_channels(&self) -> usize {
        self.channel_positions.len()
    }

    fn write_probe_file(&self, path: &Path, radius: f64) -> Result<()> {
        let text = render_probe_file(&self.channel_positions, radius).map_err(|reason| {
            SpyrunError::GeometryExport { path: path.display().to_string(), reason }
        })?;
        fs::write(path, text)?;
        debug!("Wrote probe file with {} channels to {}", self.num_channels(), path.display());
        Ok(())
    }
}

/// Renders the SpyKING CIRCUS native `.prb` probe description: total channel
/// count, adjacency radius, and a single channel group carrying the geometry.
fn render_probe_file(positions: &[[f64; 2]], radius: f64) -> std::result::Result<String, String> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(format!("adjacency radius must be finite and non-negative, got {radius}"));
    }
    for (channel, pos) in positions.iter().enumerate() {
        if !(pos[0].is_finite() && pos[1].is_finite()) {
            return Err(format!(
                "channel {channel} has a non-finite position [{}, {}]",
                pos[0], pos[1]
            ));
        }
    }

    let n = positions.len();
    let mut text = String::new();
    // Infallible: writing to a String cannot fail
    let _ = writeln!(text, "total_nb_channels = {n}");
    let _ = writeln!(text, "radius            = {radius}");
    let _ = writeln!(text, "channel_groups = {{");
    let _ = writeln!(text, "    1: {{");
    let _ = writeln!(text, "        'channels': list(range({n})),");
    let _ = writeln!(text, "        'graph': [],");
    let _ = writeln!(text, "        'geometry': {{");
    for (channel, pos) in positions.iter().enumerate() {
        let _ = writeln!(text, "            {channel}: [{}, {}],", pos[0], pos[1]);
    }
    let _ = writeln!(text, "        }}");
    let _ = writeln!(text, "    }}");
    let _ = writeln!(text, "}}");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tetrode() -> Vec<[f64; 2]> {
        vec![[0.0, 0.0], [0.0, 20.0], [20.0, 0.0], [20.0, 20.0]]
    }

    #[test]
    fn test_new_rejects_non_positive_sampling_frequency() {
        assert!(BinRecording::new("rec.dat", 0.0, tetrode()).is_err());
        assert!(BinRecording::new("rec.dat", -30000.0, tetrode()).is_err());
        assert!(BinRecording::new("rec.dat", 30000.0, tetrode()).is_ok());
    }

    #[test]
    fn test_new_rejects_empty_geometry() {
        let err = BinRecording::new("rec.dat", 30000.0, vec![]).unwrap_err();
        assert!(err.to_string().contains("no channels"));
    }

    #[test]
    fn test_constructor_errors_name_the_data_file() {
        let err = BinRecording::new("session3/rec.dat", 0.0, tetrode()).unwrap_err();
        assert!(err.to_string().contains("session3/rec.dat"), "unexpected message: {err}");

        let err = BinRecording::new("session3/rec.dat", 30000.0, vec![]).unwrap_err();
        assert!(err.to_string().contains("session3/rec.dat"), "unexpected message: {err}");
    }

    #[test]
    fn test_from_geometry_file_parses_whitespace_commas_and_comments() {
        let dir = tempfile::tempdir().unwrap();
        let geom = dir.path().join("geom.csv");
        fs::write(&geom, "# tetrode layout\n0 0\n0,20\n\n  20\t0\n20, 20\n").unwrap();

        let recording = BinRecording::from_geometry_file("rec.dat", 30000.0, &geom).unwrap();
        assert_eq!(recording.num_channels(), 4);
        assert_eq!(recording.channel_positions()[1], [0.0, 20.0]);
        assert_eq!(recording.channel_positions()[3], [20.0, 20.0]);
    }

    #[test]
    fn test_from_geometry_file_rejects_malformed_line() {
        let dir = tempfile::tempdir().unwrap();
        let geom = dir.path().join("geom.csv");
        fs::write(&geom, "0 0\n10 north\n").unwrap();

        let err = BinRecording::from_geometry_file("rec.dat", 30000.0, &geom).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("line 2"), "unexpected message: {msg}");
    }

    #[test]
    fn test_probe_file_is_single_group_sc_format() {
        let dir = tempfile::tempdir().unwrap();
        let probe = dir.path().join("probe.prb");
        let recording = BinRecording::new("rec.dat", 30000.0, tetrode()).unwrap();

        recording.write_probe_file(&probe, 100.0).unwrap();
        let text = fs::read_to_string(&probe).unwrap();

        assert!(text.contains("total_nb_channels = 4"));
        assert!(text.contains("radius            = 100"));
        assert!(text.contains("'channels': list(range(4)),"));
        assert!(text.contains("0: [0, 0],"));
        assert!(text.contains("3: [20, 20],"));
        // Exactly one channel group, regardless of any upstream grouping
        assert_eq!(text.matches("'geometry'").count(), 1);
    }

    #[test]
    fn test_probe_export_rejects_non_finite_positions() {
        let dir = tempfile::tempdir().unwrap();
        let probe = dir.path().join("probe.prb");
        let recording =
            BinRecording::new("rec.dat", 30000.0, vec![[0.0, 0.0], [f64::NAN, 10.0]]).unwrap();

        let err = recording.write_probe_file(&probe, 100.0).unwrap_err();
        assert!(matches!(err, SpyrunError::GeometryExport { .. }));
        assert!(err.to_string().contains("channel 1"));
        assert!(!probe.exists());
    }
}
