use std::fs;
use std::io;
use std::path::Path;

use fea_model::{BackendRegistry, DomainEntity, FromPortable, Model, PortableRecord};
use serde_json::Value;
use tracing::info;

use crate::error::{IoError, Result};

/// Writes `record` as pretty-printed JSON, creating parent directories.
pub fn write_record(path: impl AsRef<Path>, record: &PortableRecord) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let bytes = serde_json::to_vec_pretty(record)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_record(path: impl AsRef<Path>) -> Result<PortableRecord> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => IoError::FileNotFound(path.display().to_string()),
        _ => IoError::Io(err),
    })?;
    let value: Value = serde_json::from_slice(&bytes)?;
    Ok(PortableRecord::from_value(value)?)
}

pub fn save_model(path: impl AsRef<Path>, model: &Model) -> Result<()> {
    let path = path.as_ref();
    write_record(path, &model.to_portable())?;
    info!(path = %path.display(), model = %model.id(), "model saved");
    Ok(())
}

/// Loads a model, resolving classes against the global registry.
pub fn load_model(path: impl AsRef<Path>) -> Result<Model> {
    load_model_in(path, BackendRegistry::global())
}

pub fn load_model_in(path: impl AsRef<Path>, registry: &BackendRegistry) -> Result<Model> {
    let path = path.as_ref();
    let record = read_record(path)?;
    let model = Model::from_portable_in(&record, registry)?;
    info!(path = %path.display(), model = %model.id(), "model loaded");
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fea_model::{EntityKind, ModelError, Node, Part};

    #[test]
    fn record_roundtrip_preserves_fields() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("node.json");
        let record = Node::new([1.5, -2.0, 0.25]).with_name("tip").to_portable();

        write_record(&path, &record).expect("write should succeed");
        let loaded = read_record(&path).expect("read should succeed");
        assert_eq!(loaded, record);
    }

    #[test]
    fn read_record_fails_for_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = read_record(dir.path().join("missing.json")).expect_err("missing file should fail");
        assert!(matches!(err, IoError::FileNotFound(_)));
    }

    #[test]
    fn read_record_fails_for_invalid_payload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "{invalid json").expect("write invalid payload");
        assert!(matches!(read_record(&path), Err(IoError::Json(_))));

        fs::write(&path, "[1, 2, 3]").expect("write array payload");
        assert!(matches!(
            read_record(&path),
            Err(IoError::Model(ModelError::MalformedRecord { .. }))
        ));
    }

    #[test]
    fn load_model_rejects_other_classes() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("part.json");
        write_record(&path, &Part::new().to_portable()).expect("write");

        match load_model_in(&path, &BackendRegistry::new()) {
            Err(IoError::Model(ModelError::MalformedRecord { class, .. })) => {
                assert_eq!(class, EntityKind::Part.class_name());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
