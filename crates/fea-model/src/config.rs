//! Environment-bootstrap settings consumed by the model.

use tracing::warn;

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Allow two nodes of a part at the same location.
    pub point_overlap: bool,
    /// Node coincidence distance.
    pub global_tolerance: f64,
    /// Decimals used when rendering values.
    pub precision: usize,
    /// Report the validation summary at `info` level.
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            point_overlap: true,
            global_tolerance: 1.0,
            precision: 3,
            verbose: false,
        }
    }
}

impl Settings {
    pub const KEYS: [&'static str; 4] = ["POINT_OVERLAP", "GLOBAL_TOLERANCE", "PRECISION", "VERBOSE"];

    /// Builds settings from `KEY=VALUE` pairs over the defaults. Keys are
    /// case-insensitive; unrecognized keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let key = key.as_ref().trim().to_ascii_uppercase();
            let value = value.as_ref().trim();
            match key.as_str() {
                "POINT_OVERLAP" => settings.point_overlap = parse_bool(&key, value)?,
                "VERBOSE" => settings.verbose = parse_bool(&key, value)?,
                "GLOBAL_TOLERANCE" => {
                    settings.global_tolerance = match value.parse::<f64>() {
                        Ok(tol) if tol.is_finite() && tol >= 0.0 => tol,
                        _ => return Err(invalid(&key, value)),
                    }
                }
                "PRECISION" => {
                    settings.precision = value.parse::<usize>().map_err(|_| invalid(&key, value))?
                }
                _ => warn!(key = %key, "ignoring unrecognized setting"),
            }
        }
        Ok(settings)
    }

    /// Reads the recognized keys from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_pairs(
            std::env::vars().filter(|(key, _)| Self::KEYS.contains(&key.to_ascii_uppercase().as_str())),
        )
    }

    /// Renders `value` with the configured number of decimals.
    pub fn format_value(&self, value: f64) -> String {
        format!("{value:.prec$}", prec = self.precision)
    }

    /// True when two points are closer than the coincidence tolerance.
    pub fn coincident(&self, a: [f64; 3], b: [f64; 3]) -> bool {
        distance(a, b) <= self.global_tolerance
    }
}

pub(crate) fn distance(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> ModelError {
    ModelError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    }
}
