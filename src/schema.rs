//! Typed argument shapes derived from untyped tool schemas.
//!
//! Remote tools describe their parameters with a JSON-Schema-like object. The
//! adapter here maps that description onto a flat list of typed fields which
//! is then used both to advertise the tool to the model and to check the
//! arguments the model sends back.

use schemars::schema::{InstanceType, Metadata, ObjectValidation, RootSchema, Schema, SchemaObject};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// A JSON object, as used for schemas and argument maps.
pub type JsonObject = Map<String, Value>;

/// Errors raised while binding model-supplied arguments to a shape.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("arguments for {tool} must be a JSON object, got {found}")]
    NotAnObject { tool: String, found: String },

    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}` expects {expected}, got {found}")]
    WrongType {
        field: String,
        expected: FieldKind,
        found: String,
    },
}

/// Target-side representation of a declared primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Float,
    Integer,
    Flag,
}

/// Declared JSON type name to field kind. Anything not listed is `Text`.
const KIND_TABLE: &[(&str, FieldKind)] = &[
    ("string", FieldKind::Text),
    ("number", FieldKind::Float),
    ("integer", FieldKind::Integer),
    ("boolean", FieldKind::Flag),
];

impl FieldKind {
    /// Look up the kind for a declared `type`. Missing or unknown types map to `Text`.
    pub fn from_type_name(type_name: Option<&str>) -> Self {
        type_name
            .and_then(|name| {
                KIND_TABLE
                    .iter()
                    .find(|(declared, _)| *declared == name)
                    .map(|(_, kind)| *kind)
            })
            .unwrap_or(FieldKind::Text)
    }

    fn instance_type(self) -> InstanceType {
        match self {
            FieldKind::Text => InstanceType::String,
            FieldKind::Float => InstanceType::Number,
            FieldKind::Integer => InstanceType::Integer,
            FieldKind::Flag => InstanceType::Boolean,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Float => "a number",
            FieldKind::Integer => "an integer",
            FieldKind::Flag => "a boolean",
        };
        f.write_str(name)
    }
}

/// A single typed argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    /// Human-readable documentation taken from the schema, empty if absent.
    pub description: String,
}

/// The typed argument record for one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentShape {
    pub title: String,
    pub fields: Vec<Field>,
}

impl ArgumentShape {
    /// Derive a shape from a tool's input schema.
    ///
    /// A schema without a `properties` map yields an empty shape. Properties
    /// whose description is not an object degrade to an undocumented text field.
    pub fn from_schema(tool_name: &str, schema: &JsonObject) -> Self {
        let fields = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|properties| {
                properties
                    .iter()
                    .map(|(name, info)| Field {
                        name: name.clone(),
                        kind: FieldKind::from_type_name(info.get("type").and_then(Value::as_str)),
                        description: info
                            .get("description")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            title: format!("{tool_name}Input"),
            fields,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Render the shape as a JSON Schema object for the model's tool catalog.
    ///
    /// Every field is listed as required.
    pub fn to_json_schema(&self) -> Value {
        let mut object = ObjectValidation::default();
        for field in &self.fields {
            let property = SchemaObject {
                instance_type: Some(field.kind.instance_type().into()),
                metadata: Some(Box::new(Metadata {
                    description: Some(field.description.clone()),
                    ..Default::default()
                })),
                ..Default::default()
            };
            object
                .properties
                .insert(field.name.clone(), Schema::Object(property));
            object.required.insert(field.name.clone());
        }

        let root = RootSchema {
            meta_schema: None,
            schema: SchemaObject {
                instance_type: Some(InstanceType::Object.into()),
                metadata: Some(Box::new(Metadata {
                    title: Some(self.title.clone()),
                    ..Default::default()
                })),
                object: Some(Box::new(object)),
                ..Default::default()
            },
            definitions: Default::default(),
        };

        serde_json::to_value(root).unwrap_or_else(|_| Value::Object(JsonObject::new()))
    }

    /// Check model-supplied arguments against the shape and coerce them to the
    /// declared kinds. Keys that are not declared fields are dropped.
    pub fn bind(&self, args: &Value) -> Result<JsonObject, ShapeError> {
        let empty = JsonObject::new();
        let supplied = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(ShapeError::NotAnObject {
                    tool: self.title.clone(),
                    found: type_label(other).to_string(),
                })
            }
        };

        let mut bound = JsonObject::new();
        for field in &self.fields {
            let value = match supplied.get(&field.name) {
                None | Some(Value::Null) => {
                    return Err(ShapeError::MissingField {
                        field: field.name.clone(),
                    })
                }
                Some(v) => v,
            };
            bound.insert(field.name.clone(), coerce(field, value)?);
        }
        Ok(bound)
    }
}

fn coerce(field: &Field, value: &Value) -> Result<Value, ShapeError> {
    let coerced = match (field.kind, value) {
        (FieldKind::Text, Value::String(_)) => Some(value.clone()),
        (FieldKind::Float, Value::Number(_)) => Some(value.clone()),
        (FieldKind::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (FieldKind::Integer, Value::Number(n)) => integral(n).map(Value::from),
        (FieldKind::Integer, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (FieldKind::Flag, Value::Bool(_)) => Some(value.clone()),
        (FieldKind::Flag, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Value::Bool(false)),
            Some(1) => Some(Value::Bool(true)),
            _ => None,
        },
        (FieldKind::Flag, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(Value::Bool(true)),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    };

    coerced.ok_or_else(|| ShapeError::WrongType {
        field: field.name.clone(),
        expected: field.kind,
        found: type_label(value).to_string(),
    })
}

fn integral(n: &Number) -> Option<i64> {
    if let Some(i) = n.as_i64() {
        return Some(i);
    }
    let f = n.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn type_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
