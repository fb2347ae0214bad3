use std::fs;
use std::io;
use std::path::Path;

use fea_model::Settings;

use crate::error::{IoError, Result};

/// Reads a dotenv-style settings file: `KEY=VALUE` lines, `#` comments,
/// optional surrounding quotes on values.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => IoError::FileNotFound(path.display().to_string()),
        _ => IoError::Io(err),
    })?;
    parse_settings(&raw)
}

pub fn parse_settings(raw: &str) -> Result<Settings> {
    let mut pairs = Vec::new();
    for (i, line) in raw.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value)) = trimmed.split_once('=') else {
            return Err(IoError::Parse {
                line: i + 1,
                message: "expected KEY=VALUE".to_string(),
            });
        };
        pairs.push((key.trim().to_string(), unquote(value.trim()).to_string()));
    }
    Ok(Settings::from_pairs(pairs)?)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use fea_model::ModelError;

    #[test]
    fn parses_bootstrap_file() {
        let src = r#"
# written by the environment bootstrap
VERBOSE=False
POINT_OVERLAP=False
GLOBAL_TOLERANCE="0.5"
export PRECISION=4
"#;
        let s = parse_settings(src).expect("parse should succeed");
        assert!(!s.verbose);
        assert!(!s.point_overlap);
        assert_eq!(s.global_tolerance, 0.5);
        assert_eq!(s.precision, 4);
    }

    #[test]
    fn missing_keys_keep_defaults() {
        let s = parse_settings("PRECISION=1\n").expect("parse should succeed");
        assert_eq!(s.precision, 1);
        assert_eq!(s.global_tolerance, Settings::default().global_tolerance);
    }

    #[test]
    fn reports_line_of_malformed_entry() {
        let err = parse_settings("VERBOSE=true\nnot a pair\n").expect_err("malformed line");
        assert!(matches!(err, IoError::Parse { line: 2, .. }));
    }

    #[test]
    fn reports_invalid_values() {
        let err = parse_settings("PRECISION=-3").expect_err("negative precision");
        assert!(matches!(
            err,
            IoError::Model(ModelError::InvalidSetting { .. })
        ));
    }

    #[test]
    fn load_settings_reads_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join(".env");
        fs::write(&path, "GLOBAL_TOLERANCE=0.01\n").expect("write");
        let s = load_settings(&path).expect("load should succeed");
        assert_eq!(s.global_tolerance, 0.01);

        assert!(matches!(
            load_settings(dir.path().join("absent.env")),
            Err(IoError::FileNotFound(_))
        ));
    }
}
