//! Portable, backend-independent record form of model entities.
//!
//! A record is a JSON object with a mandatory `class` key holding the
//! abstract kind tag. Nested entities are arrays of records, in container
//! order.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ModelError, Result};
use crate::ids::{EntityId, EntityKind};

pub const CLASS_KEY: &str = "class";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortableRecord(Map<String, Value>);

impl PortableRecord {
    /// Starts a record tagged with `kind`.
    pub fn new(kind: EntityKind) -> Self {
        let mut map = Map::new();
        map.insert(CLASS_KEY.to_string(), Value::from(kind.class_name()));
        Self(map)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(ModelError::malformed(
                "<unknown>",
                CLASS_KEY,
                format!("expected an object, found {}", json_type(&other)),
            )),
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| ModelError::malformed("<unknown>", "<document>", err.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Inserts `value` only when present.
    pub fn insert_opt(&mut self, key: &str, value: Option<impl Into<Value>>) {
        if let Some(value) = value {
            self.insert(key, value);
        }
    }

    pub fn insert_ids(&mut self, key: &str, ids: &[EntityId]) {
        let ids = ids.iter().map(|id| Value::from(id.to_string())).collect::<Vec<_>>();
        self.insert(key, Value::Array(ids));
    }

    pub fn insert_records(&mut self, key: &str, records: Vec<PortableRecord>) {
        let records = records.into_iter().map(PortableRecord::into_value).collect::<Vec<_>>();
        self.insert(key, Value::Array(records));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Abstract kind named by the `class` key.
    pub fn class(&self) -> Result<EntityKind> {
        let raw = self
            .0
            .get(CLASS_KEY)
            .ok_or_else(|| ModelError::malformed("<unknown>", CLASS_KEY, "missing"))?;
        let tag = raw.as_str().ok_or_else(|| {
            ModelError::malformed("<unknown>", CLASS_KEY, format!("expected string, found {}", json_type(raw)))
        })?;
        tag.parse::<EntityKind>()
            .map_err(|err| ModelError::malformed(tag, CLASS_KEY, err.to_string()))
    }

    /// Like [`PortableRecord::class`], but also requires one of `expected`.
    pub fn expect_class(&self, expected: &[EntityKind]) -> Result<EntityKind> {
        let kind = self.class()?;
        if expected.contains(&kind) {
            Ok(kind)
        } else {
            let names = expected.iter().map(|k| k.class_name()).collect::<Vec<_>>();
            Err(ModelError::malformed(
                kind.class_name(),
                CLASS_KEY,
                format!("expected one of [{}]", names.join(", ")),
            ))
        }
    }

    pub fn require_f64(&self, field: &str) -> Result<f64> {
        let value = self.require(field)?;
        value
            .as_f64()
            .ok_or_else(|| self.wrong_type(field, "number", value))
    }

    pub fn require_str(&self, field: &str) -> Result<&str> {
        let value = self.require(field)?;
        value
            .as_str()
            .ok_or_else(|| self.wrong_type(field, "string", value))
    }

    /// Absent and `null` both read as `None`.
    pub fn optional_str(&self, field: &str) -> Result<Option<&str>> {
        match self.0.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.wrong_type(field, "string", other)),
        }
    }

    pub fn require_id(&self, field: &str) -> Result<EntityId> {
        let raw = self.require_str(field)?;
        raw.parse::<EntityId>()
            .map_err(|err| self.malformed(field, format!("invalid identifier '{raw}': {err}")))
    }

    pub fn require_ids(&self, field: &str) -> Result<Vec<EntityId>> {
        self.require(field)?;
        self.ids_or_empty(field)
    }

    /// Identifier list; an absent field is an empty list.
    pub fn ids_or_empty(&self, field: &str) -> Result<Vec<EntityId>> {
        let Some(value) = self.0.get(field) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type(field, "array", value))?;
        items
            .iter()
            .map(|item| {
                let raw = item
                    .as_str()
                    .ok_or_else(|| self.wrong_type(field, "array of strings", item))?;
                raw.parse::<EntityId>()
                    .map_err(|err| self.malformed(field, format!("invalid identifier '{raw}': {err}")))
            })
            .collect()
    }

    pub fn require_xyz(&self, field: &str) -> Result<[f64; 3]> {
        let value = self.require(field)?;
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type(field, "array", value))?;
        if items.len() != 3 {
            return Err(self.malformed(field, format!("expected 3 coordinates, found {}", items.len())));
        }
        let mut xyz = [0.0; 3];
        for (slot, item) in xyz.iter_mut().zip(items) {
            *slot = item
                .as_f64()
                .ok_or_else(|| self.wrong_type(field, "array of numbers", item))?;
        }
        Ok(xyz)
    }

    /// Nested records; an absent field is an empty list.
    pub fn records_or_empty(&self, field: &str) -> Result<Vec<PortableRecord>> {
        let Some(value) = self.0.get(field) else {
            return Ok(Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| self.wrong_type(field, "array", value))?;
        items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(PortableRecord(map.clone())),
                other => Err(self.wrong_type(field, "array of objects", other)),
            })
            .collect()
    }

    fn require(&self, field: &str) -> Result<&Value> {
        self.0
            .get(field)
            .ok_or_else(|| self.malformed(field, "missing"))
    }

    fn class_label(&self) -> String {
        self.0
            .get(CLASS_KEY)
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string()
    }

    pub(crate) fn malformed(&self, field: &str, reason: impl Into<String>) -> ModelError {
        ModelError::malformed(self.class_label(), field, reason)
    }

    fn wrong_type(&self, field: &str, expected: &str, found: &Value) -> ModelError {
        self.malformed(field, format!("expected {expected}, found {}", json_type(found)))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> PortableRecord {
        PortableRecord::from_value(value).expect("object record")
    }

    #[test]
    fn new_record_carries_class_tag() {
        let rec = PortableRecord::new(EntityKind::TieMpc);
        assert_eq!(rec.get(CLASS_KEY), Some(&json!("TieMPC")));
        assert_eq!(rec.class(), Ok(EntityKind::TieMpc));
    }

    #[test]
    fn non_object_values_are_rejected() {
        let err = PortableRecord::from_value(json!([1, 2])).expect_err("array is not a record");
        assert!(matches!(err, ModelError::MalformedRecord { ref field, .. } if field == CLASS_KEY));
    }

    #[test]
    fn missing_and_unknown_class_are_malformed() {
        let missing = record(json!({"x": 1.0}));
        assert!(matches!(missing.class(), Err(ModelError::MalformedRecord { .. })));

        let unknown = record(json!({"class": "AbaqusTieMPC"}));
        match unknown.class() {
            Err(ModelError::MalformedRecord { class, field, .. }) => {
                assert_eq!(class, "AbaqusTieMPC");
                assert_eq!(field, "class");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn expect_class_filters_kinds() {
        let rec = record(json!({"class": "Node"}));
        assert_eq!(rec.expect_class(&[EntityKind::Node]), Ok(EntityKind::Node));
        assert!(rec.expect_class(&[EntityKind::Part, EntityKind::Step]).is_err());
    }

    #[test]
    fn typed_accessors_report_field_and_reason() {
        let rec = record(json!({"class": "TieMPC", "tol": "small", "xyz": [0.0, 1.0]}));
        match rec.require_f64("tol") {
            Err(ModelError::MalformedRecord { class, field, reason }) => {
                assert_eq!(class, "TieMPC");
                assert_eq!(field, "tol");
                assert_eq!(reason, "expected number, found string");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(rec.require_f64("missing").is_err());
        assert!(rec.require_xyz("xyz").is_err());
    }

    #[test]
    fn optional_and_defaulted_fields() {
        let rec = record(json!({"class": "Step", "name": null}));
        assert_eq!(rec.optional_str("name"), Ok(None));
        assert_eq!(rec.ids_or_empty("nodes"), Ok(Vec::new()));
        assert_eq!(rec.records_or_empty("loads"), Ok(Vec::new()));
        assert!(rec.require_ids("nodes").is_err());
    }

    #[test]
    fn identifier_lists_parse() {
        let a = EntityId::new();
        let b = EntityId::new();
        let mut rec = PortableRecord::new(EntityKind::BeamMpc);
        rec.insert_ids("slaves", &[a, b]);
        assert_eq!(rec.require_ids("slaves"), Ok(vec![a, b]));

        rec.insert("slaves", json!(["nope"]));
        assert!(rec.require_ids("slaves").is_err());
    }

    #[test]
    fn json_text_round_trip() {
        let mut rec = PortableRecord::new(EntityKind::Node);
        rec.insert("xyz", json!([1.0, 2.0, 3.0]));
        let parsed = PortableRecord::from_json_str(&rec.to_json_string()).expect("valid json");
        assert_eq!(parsed, rec);
        assert!(PortableRecord::from_json_str("{oops").is_err());
    }
}
