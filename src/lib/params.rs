//! Parameter schema for SpyKING CIRCUS runs.
//!
//! The schema declares the recognized options, their types, defaults, and a
//! human-readable description each. Callers supply overrides as a name→value
//! map; [`validate`] checks them against the schema and fills the rest from
//! defaults, producing an immutable [`ParameterSet`]. Worker-count resolution
//! happens later, in the artifact-generation stage, and never mutates the set
//! in place.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SpyrunError};

/// An override map as supplied by callers (CLI flags, JSON files, pipeline code).
pub type Overrides = BTreeMap<String, ParamValue>;

/// A dynamically-typed parameter value, as found in override maps.
///
/// JSON `null` maps to [`ParamValue::Auto`], matching the original convention
/// of leaving `num_workers` unset so it is derived from the host CPU count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A boolean value
    Bool(bool),
    /// An integer value
    Int(i64),
    /// A floating-point value
    Float(f64),
    /// A string value (never valid for any current option; kept so that a
    /// string override produces a type error rather than a parse failure)
    Text(String),
    /// Unset / derive automatically
    Auto,
}

impl ParamValue {
    /// Name of the value's type, used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ParamValue::Bool(_) => "bool",
            ParamValue::Int(_) => "int",
            ParamValue::Float(_) => "float",
            ParamValue::Text(_) => "string",
            ParamValue::Auto => "auto",
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Text(v) => write!(f, "{v}"),
            ParamValue::Auto => write!(f, "auto"),
        }
    }
}

/// Declared type of a schema option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// A (possibly negative) integer
    Int,
    /// A floating-point number; integer overrides are accepted
    Float,
    /// A boolean
    Bool,
    /// A positive integer, or unset to derive from the host CPU count
    IntOrAuto,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Int => write!(f, "int"),
            ParamKind::Float => write!(f, "float"),
            ParamKind::Bool => write!(f, "bool"),
            ParamKind::IntOrAuto => write!(f, "int or auto"),
        }
    }
}

/// One recognized option: name, type, default, and description.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    /// Option name as it appears in override maps
    pub name: &'static str,
    /// Declared type
    pub kind: ParamKind,
    /// Built-in default
    pub default: ParamValue,
    /// Human-readable description
    pub description: &'static str,
}

/// The full set of recognized options.
///
/// Order here is the order the `params` command prints them in.
pub const SCHEMA: &[ParamSpec] = &[
    ParamSpec {
        name: "detect_sign",
        kind: ParamKind::Int,
        default: ParamValue::Int(-1),
        description: "Use -1, 0, or 1, depending on the sign of the spikes in the recording",
    },
    ParamSpec {
        name: "adjacency_radius",
        kind: ParamKind::Float,
        default: ParamValue::Float(100.0),
        description: "Distance (in microns) of the adjacency radius",
    },
    ParamSpec {
        name: "detect_threshold",
        kind: ParamKind::Float,
        default: ParamValue::Float(6.0),
        description: "Threshold for detection",
    },
    ParamSpec {
        name: "template_width_ms",
        kind: ParamKind::Float,
        default: ParamValue::Float(3.0),
        description: "Width of templates (ms)",
    },
    ParamSpec {
        name: "filter",
        kind: ParamKind::Bool,
        default: ParamValue::Bool(true),
        description: "If true, the recording will be filtered",
    },
    ParamSpec {
        name: "merge_spikes",
        kind: ParamKind::Bool,
        default: ParamValue::Bool(true),
        description: "If true, spikes will be merged at the end",
    },
    ParamSpec {
        name: "auto_merge",
        kind: ParamKind::Float,
        default: ParamValue::Float(0.75),
        description: "Auto-merge similarity threshold, used only when merge_spikes is enabled",
    },
    ParamSpec {
        name: "num_workers",
        kind: ParamKind::IntOrAuto,
        default: ParamValue::Auto,
        description: "Number of parallel workers; derived from the host CPU count when unset",
    },
    ParamSpec {
        name: "whitening_max_elts",
        kind: ParamKind::Int,
        default: ParamValue::Int(1000),
        description: "Max number of events subsampled during the whitening stage",
    },
    ParamSpec {
        name: "clustering_max_elts",
        kind: ParamKind::Int,
        default: ParamValue::Int(10000),
        description: "Max number of events subsampled during the clustering stage",
    },
];

/// A validated, fully-populated parameter set.
///
/// Constructed only by [`defaults`] or [`validate`]; immutable thereafter.
/// `num_workers` stays `None` ("auto") until the artifact-generation stage
/// resolves it into a separate value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet {
    /// Spike polarity to detect: -1, 0, or 1
    pub detect_sign: i64,
    /// Channel neighborhood radius (microns), written into the probe file
    pub adjacency_radius: f64,
    /// Detection sensitivity threshold
    pub detect_threshold: f64,
    /// Template duration in milliseconds
    pub template_width_ms: f64,
    /// Enable pre-filtering
    pub filter: bool,
    /// Enable the post-hoc merge pass
    pub merge_spikes: bool,
    /// Merge similarity threshold, effective only when `merge_spikes`
    pub auto_merge: f64,
    /// Worker-process count; `None` means derive from the host CPU count
    pub num_workers: Option<usize>,
    /// Subsampling cap for the whitening stage
    pub whitening_max_elts: i64,
    /// Subsampling cap for the clustering stage
    pub clustering_max_elts: i64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        defaults()
    }
}

impl ParameterSet {
    /// Converts the set back into a full override map, one entry per schema key.
    ///
    /// `validate(&set.as_overrides())` reproduces `set` exactly.
    #[must_use]
    pub fn as_overrides(&self) -> Overrides {
        let mut map = Overrides::new();
        map.insert("detect_sign".into(), ParamValue::Int(self.detect_sign));
        map.insert("adjacency_radius".into(), ParamValue::Float(self.adjacency_radius));
        map.insert("detect_threshold".into(), ParamValue::Float(self.detect_threshold));
        map.insert("template_width_ms".into(), ParamValue::Float(self.template_width_ms));
        map.insert("filter".into(), ParamValue::Bool(self.filter));
        map.insert("merge_spikes".into(), ParamValue::Bool(self.merge_spikes));
        map.insert("auto_merge".into(), ParamValue::Float(self.auto_merge));
        map.insert(
            "num_workers".into(),
            match self.num_workers {
                Some(n) => ParamValue::Int(n as i64),
                None => ParamValue::Auto,
            },
        );
        map.insert("whitening_max_elts".into(), ParamValue::Int(self.whitening_max_elts));
        map.insert("clustering_max_elts".into(), ParamValue::Int(self.clustering_max_elts));
        map
    }
}

/// Returns the parameter set with every option at its built-in default.
#[must_use]
pub fn defaults() -> ParameterSet {
    ParameterSet {
        detect_sign: -1,
        adjacency_radius: 100.0,
        detect_threshold: 6.0,
        template_width_ms: 3.0,
        filter: true,
        merge_spikes: true,
        auto_merge: 0.75,
        num_workers: None,
        whitening_max_elts: 1000,
        clustering_max_elts: 10000,
    }
}

/// Validates caller overrides against the schema and fills the rest from defaults.
///
/// # Errors
///
/// Returns [`SpyrunError::UnknownOption`] for a key absent from the schema and
/// [`SpyrunError::TypeMismatch`] for a value whose type disagrees with the
/// schema's declaration. No side effects in either case.
pub fn validate(overrides: &Overrides) -> Result<ParameterSet> {
    for name in overrides.keys() {
        if !SCHEMA.iter().any(|spec| spec.name == name) {
            return Err(SpyrunError::UnknownOption { name: name.clone() });
        }
    }

    let mut params = defaults();
    for (name, value) in overrides {
        match name.as_str() {
            "detect_sign" => params.detect_sign = expect_int(name, value)?,
            "adjacency_radius" => params.adjacency_radius = expect_float(name, value)?,
            "detect_threshold" => params.detect_threshold = expect_float(name, value)?,
            "template_width_ms" => params.template_width_ms = expect_float(name, value)?,
            "filter" => params.filter = expect_bool(name, value)?,
            "merge_spikes" => params.merge_spikes = expect_bool(name, value)?,
            "auto_merge" => params.auto_merge = expect_float(name, value)?,
            "num_workers" => params.num_workers = expect_workers(name, value)?,
            "whitening_max_elts" => params.whitening_max_elts = expect_int(name, value)?,
            "clustering_max_elts" => params.clustering_max_elts = expect_int(name, value)?,
            // Unknown keys were rejected above
            _ => unreachable!("key '{name}' passed the schema check"),
        }
    }
    Ok(params)
}

fn type_mismatch(name: &str, expected: &'static str, value: &ParamValue) -> SpyrunError {
    SpyrunError::TypeMismatch {
        parameter: name.to_string(),
        expected,
        actual: value.type_name().to_string(),
    }
}

fn expect_int(name: &str, value: &ParamValue) -> Result<i64> {
    match value {
        ParamValue::Int(v) => Ok(*v),
        other => Err(type_mismatch(name, "int", other)),
    }
}

fn expect_float(name: &str, value: &ParamValue) -> Result<f64> {
    match value {
        ParamValue::Float(v) => Ok(*v),
        ParamValue::Int(v) => Ok(*v as f64),
        other => Err(type_mismatch(name, "float", other)),
    }
}

fn expect_bool(name: &str, value: &ParamValue) -> Result<bool> {
    match value {
        ParamValue::Bool(v) => Ok(*v),
        other => Err(type_mismatch(name, "bool", other)),
    }
}

fn expect_workers(name: &str, value: &ParamValue) -> Result<Option<usize>> {
    match value {
        ParamValue::Auto => Ok(None),
        ParamValue::Int(v) if *v >= 1 => Ok(Some(*v as usize)),
        other => Err(type_mismatch(name, "a positive int or auto", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults_match_schema() {
        let params = defaults();
        let overrides = params.as_overrides();
        assert_eq!(overrides.len(), SCHEMA.len());
        for spec in SCHEMA {
            assert_eq!(overrides.get(spec.name), Some(&spec.default), "option {}", spec.name);
        }
    }

    #[test]
    fn test_validate_empty_overrides_yields_defaults() {
        let params = validate(&Overrides::new()).unwrap();
        assert_eq!(params, defaults());
    }

    #[test]
    fn test_validate_fills_unspecified_keys_from_defaults() {
        let mut overrides = Overrides::new();
        overrides.insert("detect_threshold".into(), ParamValue::Float(4.5));
        let params = validate(&overrides).unwrap();
        assert_eq!(params.detect_threshold, 4.5);
        // Everything else stays at its documented default
        assert_eq!(params.detect_sign, -1);
        assert_eq!(params.adjacency_radius, 100.0);
        assert!(params.filter);
        assert_eq!(params.num_workers, None);
    }

    #[test]
    fn test_validate_is_idempotent() {
        let mut overrides = Overrides::new();
        overrides.insert("detect_sign".into(), ParamValue::Int(1));
        overrides.insert("merge_spikes".into(), ParamValue::Bool(false));
        overrides.insert("num_workers".into(), ParamValue::Int(3));

        let once = validate(&overrides).unwrap();
        let twice = validate(&once.as_overrides()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_validate_rejects_unknown_option() {
        let mut overrides = Overrides::new();
        overrides.insert("detect_singe".into(), ParamValue::Int(-1));
        let err = validate(&overrides).unwrap_err();
        assert!(matches!(err, SpyrunError::UnknownOption { ref name } if name == "detect_singe"));
    }

    #[rstest]
    #[case("filter", ParamValue::Int(1), "bool-typed option given an int")]
    #[case("filter", ParamValue::Text("yes".into()), "bool-typed option given a string")]
    #[case("detect_sign", ParamValue::Float(1.5), "int-typed option given a float")]
    #[case("detect_threshold", ParamValue::Text("high".into()), "float option given a string")]
    #[case("num_workers", ParamValue::Int(0), "worker count of zero")]
    #[case("num_workers", ParamValue::Bool(true), "worker count given a bool")]
    fn test_validate_rejects_type_mismatch(
        #[case] name: &str,
        #[case] value: ParamValue,
        #[case] description: &str,
    ) {
        let mut overrides = Overrides::new();
        overrides.insert(name.to_string(), value);
        let err = validate(&overrides).unwrap_err();
        assert!(
            matches!(err, SpyrunError::TypeMismatch { ref parameter, .. } if parameter == name),
            "expected TypeMismatch for: {description}, got {err:?}"
        );
    }

    #[test]
    fn test_float_option_accepts_int_override() {
        let mut overrides = Overrides::new();
        overrides.insert("adjacency_radius".into(), ParamValue::Int(50));
        let params = validate(&overrides).unwrap();
        assert_eq!(params.adjacency_radius, 50.0);
    }

    #[test]
    fn test_num_workers_explicit_value() {
        let mut overrides = Overrides::new();
        overrides.insert("num_workers".into(), ParamValue::Int(6));
        let params = validate(&overrides).unwrap();
        assert_eq!(params.num_workers, Some(6));
    }

    #[test]
    fn test_overrides_deserialize_from_json() {
        let json = r#"{
            "detect_sign": 1,
            "detect_threshold": 5.5,
            "filter": false,
            "num_workers": null
        }"#;
        let overrides: Overrides = serde_json::from_str(json).unwrap();
        assert_eq!(overrides.get("detect_sign"), Some(&ParamValue::Int(1)));
        assert_eq!(overrides.get("detect_threshold"), Some(&ParamValue::Float(5.5)));
        assert_eq!(overrides.get("filter"), Some(&ParamValue::Bool(false)));
        assert_eq!(overrides.get("num_workers"), Some(&ParamValue::Auto));

        let params = validate(&overrides).unwrap();
        assert_eq!(params.detect_sign, 1);
        assert_eq!(params.num_workers, None);
    }

    #[test]
    fn test_string_override_is_a_type_error_not_a_parse_error() {
        let json = r#"{"detect_threshold": "very high"}"#;
        let overrides: Overrides = serde_json::from_str(json).unwrap();
        let err = validate(&overrides).unwrap_err();
        assert!(err.to_string().contains("got string"));
    }
}
