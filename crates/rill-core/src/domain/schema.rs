//! Structural schema for record payloads.
//!
//! A small JSON-schema-like subset: primitive types, arrays with an item
//! schema, and objects with named properties. Serialized in the usual
//! JSON-schema shape (`{"type": "object", "properties": {...}}`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::errors::StreamError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Schema {
    /// Accepts any value.
    #[default]
    Any,
    Null,
    Boolean,
    Number,
    Integer,
    String,
    Array {
        #[serde(default)]
        items: Box<Schema>,
    },
    Object {
        #[serde(default)]
        properties: BTreeMap<String, Schema>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
        #[serde(default = "default_true", rename = "additionalProperties")]
        additional_properties: bool,
    },
}

fn default_true() -> bool {
    true
}

impl Schema {
    /// Object schema where every listed property is required.
    ///
    /// ```ignore
    /// let schema = Schema::object([("x", Schema::Number)]);
    /// ```
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let properties: BTreeMap<String, Schema> = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect();
        let required = properties.keys().cloned().collect();
        Schema::Object {
            properties,
            required,
            additional_properties: true,
        }
    }

    pub fn array(items: Schema) -> Self {
        Schema::Array {
            items: Box::new(items),
        }
    }

    /// Forbid properties not listed in an object schema. No-op otherwise.
    pub fn closed(mut self) -> Self {
        if let Schema::Object {
            additional_properties,
            ..
        } = &mut self
        {
            *additional_properties = false;
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Schema::Any => "any",
            Schema::Null => "null",
            Schema::Boolean => "boolean",
            Schema::Number => "number",
            Schema::Integer => "integer",
            Schema::String => "string",
            Schema::Array { .. } => "array",
            Schema::Object { .. } => "object",
        }
    }

    /// Returns every violation found, each prefixed with its JSON path.
    pub fn violations(&self, value: &Value) -> Vec<String> {
        let mut out = Vec::new();
        self.collect("$", value, &mut out);
        out
    }

    pub fn validate(&self, value: &Value) -> Result<(), StreamError> {
        let violations = self.violations(value);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(StreamError::schema(violations))
        }
    }

    fn collect(&self, path: &str, value: &Value, out: &mut Vec<String>) {
        let matches = match (self, value) {
            (Schema::Any, _) => true,
            (Schema::Null, Value::Null) => true,
            (Schema::Boolean, Value::Bool(_)) => true,
            (Schema::Number, Value::Number(_)) => true,
            (Schema::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
            (Schema::String, Value::String(_)) => true,
            (Schema::Array { items }, Value::Array(values)) => {
                for (i, v) in values.iter().enumerate() {
                    items.collect(&format!("{path}[{i}]"), v, out);
                }
                true
            }
            (
                Schema::Object {
                    properties,
                    required,
                    additional_properties,
                },
                Value::Object(map),
            ) => {
                for key in required {
                    if !map.contains_key(key) {
                        out.push(format!("{path}.{key}: missing required property"));
                    }
                }
                for (key, v) in map {
                    match properties.get(key) {
                        Some(schema) => schema.collect(&format!("{path}.{key}"), v, out),
                        None if !additional_properties => {
                            out.push(format!("{path}.{key}: unexpected property"));
                        }
                        None => {}
                    }
                }
                true
            }
            _ => false,
        };
        if !matches {
            out.push(format!(
                "{path}: expected {}, found {}",
                self.type_name(),
                value_type(value)
            ));
        }
    }

    /// Same shape serde produces, built without a fallible serializer.
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        doc.insert("type".into(), Value::from(self.type_name()));
        match self {
            Schema::Array { items } => {
                doc.insert("items".into(), items.to_value());
            }
            Schema::Object {
                properties,
                required,
                additional_properties,
            } => {
                let props = properties
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value()))
                    .collect::<Map<_, _>>();
                doc.insert("properties".into(), Value::Object(props));
                if !required.is_empty() {
                    doc.insert(
                        "required".into(),
                        Value::Array(required.iter().cloned().map(Value::from).collect()),
                    );
                }
                doc.insert(
                    "additionalProperties".into(),
                    Value::Bool(*additional_properties),
                );
            }
            _ => {}
        }
        Value::Object(doc)
    }
}

fn value_type(value: &Value) -> &'static str {
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
    use rstest::rstest;
    use serde_json::json;

    fn point() -> Schema {
        Schema::object([("x", Schema::Number)])
    }

    #[rstest]
    #[case::number(point(), json!({"x": 1}))]
    #[case::float(point(), json!({"x": 1.5}))]
    #[case::extra_allowed(point(), json!({"x": 1, "y": "z"}))]
    #[case::any(Schema::Any, json!([1, "a", null]))]
    #[case::integer(Schema::Integer, json!(-4))]
    #[case::array(Schema::array(Schema::String), json!(["a", "b"]))]
    #[case::empty_array(Schema::array(Schema::Boolean), json!([]))]
    fn conforming_payloads_validate(#[case] schema: Schema, #[case] payload: Value) {
        assert!(schema.validate(&payload).is_ok());
    }

    #[rstest]
    #[case::wrong_type(point(), json!({"x": "1"}))]
    #[case::missing(point(), json!({}))]
    #[case::not_object(point(), json!(1))]
    #[case::closed(point().closed(), json!({"x": 1, "y": 2}))]
    #[case::float_for_integer(Schema::Integer, json!(1.5))]
    #[case::bad_item(Schema::array(Schema::String), json!(["a", 1]))]
    #[case::null(Schema::Null, json!(false))]
    fn non_conforming_payloads_are_rejected(#[case] schema: Schema, #[case] payload: Value) {
        let err = schema.validate(&payload).unwrap_err();
        assert!(matches!(err, StreamError::SchemaValidation { .. }));
    }

    #[test]
    fn violations_carry_paths() {
        let schema = Schema::object([
            ("x", Schema::Number),
            ("tags", Schema::array(Schema::String)),
        ]);
        let violations = schema.violations(&json!({"x": true, "tags": ["a", 2]}));
        assert_eq!(
            violations,
            vec![
                "$.tags[1]: expected string, found number".to_string(),
                "$.x: expected number, found boolean".to_string(),
            ]
        );
    }

    #[test]
    fn to_value_matches_serde_shape() {
        let schema = Schema::object([("x", Schema::Number), ("ys", Schema::array(Schema::Any))]);
        let via_serde = serde_json::to_value(&schema).unwrap();
        assert_eq!(schema.to_value(), via_serde);

        let back: Schema = serde_json::from_value(via_serde).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn json_schema_documents_parse_with_defaults() {
        let schema: Schema = serde_json::from_str(
            r#"{"type": "object", "properties": {"x": {"type": "number"}}}"#,
        )
        .unwrap();
        // Nothing required and extra properties allowed.
        assert!(schema.validate(&json!({})).is_ok());
        assert!(schema.validate(&json!({"x": "a"})).is_err());
    }
}
