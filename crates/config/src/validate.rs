//! Configuration validation.
//!
//! Checks syntax, flags unknown or misspelled fields, and reports values
//! that parse but cannot work (quality out of range, zero timeouts).

use std::{collections::HashMap, path::Path};

use crate::schema::FolioConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "range", "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "download.delay_ms"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

const DOWNLOAD_FIELDS: &[&str] = &["delay_ms", "jpeg_quality", "fetch_timeout_secs", "user_agent"];
const OUTPUT_FIELDS: &[&str] = &["dir"];

/// Known keys per table, mirroring `schema.rs`.
fn known_fields() -> HashMap<&'static str, &'static [&'static str]> {
    HashMap::from([("download", DOWNLOAD_FIELDS), ("output", OUTPUT_FIELDS)])
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|c| (*c, levenshtein(needle, c)))
        .filter(|(_, d)| *d > 0 && *d <= max_distance)
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or the discovered config file
/// if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => crate::loader::find_config_file(),
    };

    let Some(ref actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    match std::fs::read_to_string(actual_path) {
        Ok(content) => {
            let content = crate::env_subst::substitute_env(&content);
            let mut result = match actual_path.extension().and_then(|e| e.to_str()) {
                Some("yaml" | "yml") => validate_json_like(serde_yaml::from_str(&content), "YAML"),
                Some("json") => validate_json_like(serde_json::from_str(&content), "JSON"),
                _ => validate_toml_str(&content),
            };
            result.config_path = Some(actual_path.clone());
            result
        },
        Err(e) => ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Error,
                category: "syntax",
                path: String::new(),
                message: format!("failed to read config file: {e}"),
            }],
            config_path: Some(actual_path.clone()),
        },
    }
}

/// Validate a TOML string without touching the filesystem.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> ValidationResult {
    let value: toml::Value = match toml::from_str(toml_str) {
        Ok(v) => v,
        Err(e) => return syntax_error("TOML", e),
    };
    let typed = toml::from_str::<FolioConfig>(toml_str).map_err(|e| e.to_string());
    check_tree(value.as_table(), typed)
}

/// YAML and JSON share one path through `serde_json::Value`, which can hold
/// the `null`s TOML has no spelling for.
fn validate_json_like<E: std::fmt::Display>(
    parsed: Result<serde_json::Value, E>,
    format: &str,
) -> ValidationResult {
    let mut value = match parsed {
        Ok(v) => v,
        Err(e) => return syntax_error(format, e),
    };
    let typed = serde_json::from_value::<FolioConfig>(value.clone()).map_err(|e| e.to_string());

    // A null field means "unset"; only the key names matter past this point.
    drop_nulls(&mut value);
    let tree = toml::Value::try_from(&value).ok();
    check_tree(tree.as_ref().and_then(toml::Value::as_table), typed)
}

fn drop_nulls(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(drop_nulls);
        },
        serde_json::Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(drop_nulls);
        },
        _ => {},
    }
}

fn syntax_error(format: &str, e: impl std::fmt::Display) -> ValidationResult {
    ValidationResult {
        diagnostics: vec![Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message: format!("{format} syntax error: {e}"),
        }],
        config_path: None,
    }
}

fn check_tree(
    table: Option<&toml::map::Map<String, toml::Value>>,
    typed: Result<FolioConfig, String>,
) -> ValidationResult {
    let mut diagnostics = Vec::new();

    if let Some(table) = table {
        check_unknown_fields(table, &mut diagnostics);
    }

    match typed {
        Ok(config) => check_ranges(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

fn check_unknown_fields(
    table: &toml::map::Map<String, toml::Value>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let schema = known_fields();
    let sections: Vec<&str> = schema.keys().copied().collect();

    for (key, value) in table {
        let Some(fields) = schema.get(key.as_str()) else {
            let message = match suggest(key, &sections, 3) {
                Some(s) => format!("unknown field at top level (did you mean \"{s}\"?)"),
                None => "unknown field at top level".into(),
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "unknown-field",
                path: key.clone(),
                message,
            });
            continue;
        };

        let Some(section) = value.as_table() else {
            continue;
        };
        for child in section.keys() {
            if fields.contains(&child.as_str()) {
                continue;
            }
            let message = match suggest(child, fields, 3) {
                Some(s) => format!("unknown field (did you mean \"{s}\"?)"),
                None => "unknown field".into(),
            };
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                category: "unknown-field",
                path: format!("{key}.{child}"),
                message,
            });
        }
    }
}

fn check_ranges(config: &FolioConfig, diagnostics: &mut Vec<Diagnostic>) {
    let dl = &config.download;
    if !(1..=100).contains(&dl.jpeg_quality) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "range",
            path: "download.jpeg_quality".into(),
            message: format!("must be between 1 and 100, got {}", dl.jpeg_quality),
        });
    }
    if dl.fetch_timeout_secs == Some(0) {
        diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "range",
            path: "download.fetch_timeout_secs".into(),
            message: "a zero timeout fails every request; remove the key to disable".into(),
        });
    }
    if dl.delay_ms == 0 {
        diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            category: "range",
            path: "download.delay_ms".into(),
            message: "no pause between downloads; large batches may be throttled".into(),
        });
    }
}
