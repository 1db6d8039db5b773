//! Parameter descriptors and their normalisation to JSON schema.

use serde_json::{json, Map, Value};

/// Kind of a single tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    Array(Box<FieldKind>),
    Object,
}

impl FieldKind {
    fn to_schema(&self, description: &str) -> Value {
        match self {
            FieldKind::String => json_schema_string(description),
            FieldKind::Number => json_schema_number(description),
            FieldKind::Boolean => json_schema_boolean(description),
            FieldKind::Array(items) => json_schema_array(items.to_schema(""), description),
            FieldKind::Object => json!({
                "type": "object",
                "description": description,
            }),
        }
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub description: String,
    pub required: bool,
}

impl Field {
    pub fn required(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, kind: FieldKind, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// The parameter descriptor a tool is registered with.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParameterSchema {
    /// Typed field list.
    Fields(Vec<Field>),
    /// A JSON schema supplied as-is.
    Raw(Value),
    /// No introspectable shape.
    #[default]
    Opaque,
}

impl ParameterSchema {
    pub fn none() -> Self {
        ParameterSchema::Fields(Vec::new())
    }

    /// Canonical JSON-schema object for this descriptor.
    ///
    /// Anything that is not an object schema becomes
    /// `{"type":"object","properties":{}}`.
    pub fn normalize(&self) -> Value {
        match self {
            ParameterSchema::Fields(fields) => {
                let mut properties = Map::new();
                let mut required = Vec::new();
                for field in fields {
                    properties.insert(field.name.clone(), field.kind.to_schema(&field.description));
                    if field.required {
                        required.push(field.name.as_str());
                    }
                }
                let mut schema = json_schema_object(Value::Object(properties), required);
                schema["additionalProperties"] = Value::Bool(false);
                schema
            }
            ParameterSchema::Raw(Value::Object(raw))
                if raw.get("type").and_then(Value::as_str) == Some("object") =>
            {
                let mut schema = raw.clone();
                if !schema.get("properties").is_some_and(Value::is_object) {
                    schema.insert("properties".to_string(), json!({}));
                }
                Value::Object(schema)
            }
            ParameterSchema::Raw(_) | ParameterSchema::Opaque => open_object_schema(),
        }
    }
}

pub fn open_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    if required.is_empty() {
        return json!({
            "type": "object",
            "properties": properties,
        });
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    described("string", description)
}

pub fn json_schema_number(description: &str) -> Value {
    described("number", description)
}

pub fn json_schema_boolean(description: &str) -> Value {
    described("boolean", description)
}

pub fn json_schema_array(items: Value, description: &str) -> Value {
    let mut schema = described("array", description);
    schema["items"] = items;
    schema
}

fn described(kind: &str, description: &str) -> Value {
    if description.is_empty() {
        json!({ "type": kind })
    } else {
        json!({ "type": kind, "description": description })
    }
}
