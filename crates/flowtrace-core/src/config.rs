//! Explorer configuration: an opaque JSON object loaded at startup.
//!
//! Nothing here interprets the settings beyond dotted-path lookups; the object is forwarded
//! unchanged to the host runtime as `{"config": ...}`.

use crate::{Error, Result};
use serde_json::{Map, Value};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig(Value);

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self::empty_object()
    }
}

impl ExplorerConfig {
    pub fn empty_object() -> Self {
        Self(Value::Object(Map::new()))
    }

    /// Wraps a parsed config. Only JSON objects are accepted: every consumer reads dotted
    /// keys, so an array or scalar is reported as [`Error::ConfigNotObject`] instead of being
    /// forwarded to the runtime as is.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::ConfigNotObject {
                kind: json_kind(&value),
            });
        }
        Ok(Self(value))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&text).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg = Self::from_value(value)?;
        tracing::debug!(path = %path.display(), "loaded explorer configuration");
        Ok(cfg)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Initialization flags for the host runtime.
    pub fn runtime_flags(&self) -> Value {
        serde_json::json!({ "config": self.0 })
    }

    fn lookup(&self, dotted_path: &str) -> Option<&Value> {
        let mut cur = &self.0;
        for segment in dotted_path.split('.') {
            cur = cur.as_object()?.get(segment)?;
        }
        Some(cur)
    }

    pub fn get_str(&self, dotted_path: &str) -> Option<&str> {
        self.lookup(dotted_path)?.as_str()
    }

    pub fn get_f64(&self, dotted_path: &str) -> Option<f64> {
        let v = self.lookup(dotted_path)?;
        v.as_f64().or_else(|| v.as_str()?.trim().parse().ok())
    }

    /// Recursively overlays `incoming` onto this config; non-object values replace.
    pub fn deep_merge(&mut self, incoming: &Value) {
        merge_into(&mut self.0, incoming);
    }
}

fn merge_into(base: &mut Value, incoming: &Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(in_map)) => {
            for (key, in_value) in in_map {
                match base_map.get_mut(key) {
                    Some(slot) => merge_into(slot, in_value),
                    None => {
                        base_map.insert(key.clone(), in_value.clone());
                    }
                }
            }
        }
        (slot, in_value) => *slot = in_value.clone(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dotted_paths_read_nested_objects() {
        let cfg = ExplorerConfig::from_value(json!({
            "nflowUrl": "http://localhost:7500/nflow/api",
            "graph": {"width": "640"}
        }))
        .unwrap();

        assert_eq!(
            cfg.get_str("nflowUrl"),
            Some("http://localhost:7500/nflow/api")
        );
        assert_eq!(cfg.get_f64("graph.width"), Some(640.0));
        assert_eq!(cfg.get_f64("graph.missing"), None);
        assert_eq!(cfg.get_f64("nflowUrl.graph"), None);
    }

    #[test]
    fn deep_merge_keeps_unrelated_keys() {
        let mut cfg = ExplorerConfig::from_value(json!({"a": {"b": 1, "c": 2}})).unwrap();
        cfg.deep_merge(&json!({"a": {"c": 3}, "d": true}));
        assert_eq!(cfg.as_value(), &json!({"a": {"b": 1, "c": 3}, "d": true}));
    }

    #[test]
    fn non_object_config_is_rejected() {
        let err = ExplorerConfig::from_value(json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::ConfigNotObject { kind: "an array" }));
        for scalar in [json!(null), json!(true), json!(3), json!("x")] {
            assert!(matches!(
                ExplorerConfig::from_value(scalar),
                Err(Error::ConfigNotObject { .. })
            ));
        }
    }

    #[test]
    fn runtime_flags_wrap_config_unchanged() {
        let cfg = ExplorerConfig::from_value(json!({"refreshSeconds": 60})).unwrap();
        assert_eq!(
            cfg.runtime_flags(),
            json!({"config": {"refreshSeconds": 60}})
        );
    }
}
