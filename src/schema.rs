//! Declarative tool input schemas.
//!
//! A [`ToolSchema`] is plain data: field names, types, optionality, defaults
//! and permitted values. Two independent consumers read it:
//! [`ToolSchema::validate`] checks an incoming argument bag, and
//! [`ToolSchema::to_json_schema`] renders the JSON Schema advertised to MCP
//! clients as a tool's `inputSchema`.

use std::fmt;

use serde_json::{json, Map, Value};

const JSON_SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

/// Primitive and structural field types.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Integer,
    Boolean,
    /// A string or an integer (run IDs arrive both ways).
    StringOrInteger,
    Array(Box<FieldType>),
    /// Object with declared fields; undeclared keys are dropped.
    Object(Vec<Field>),
    /// Object with arbitrary keys and values, forwarded as-is.
    AnyObject,
    /// Object with arbitrary keys whose values share one type.
    Record(Box<FieldType>),
}

/// A single named input field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
    pub allowed: Option<Vec<&'static str>>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub description: Option<&'static str>,
}

impl Field {
    /// Create a required field of the given type.
    pub fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            nullable: false,
            default: None,
            allowed: None,
            min: None,
            max: None,
            description: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn integer(name: &'static str) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn string_or_integer(name: &'static str) -> Self {
        Self::new(name, FieldType::StringOrInteger)
    }

    pub fn array(name: &'static str, items: FieldType) -> Self {
        Self::new(name, FieldType::Array(Box::new(items)))
    }

    pub fn object(name: &'static str, fields: Vec<Field>) -> Self {
        Self::new(name, FieldType::Object(fields))
    }

    pub fn any_object(name: &'static str) -> Self {
        Self::new(name, FieldType::AnyObject)
    }

    pub fn record(name: &'static str, values: FieldType) -> Self {
        Self::new(name, FieldType::Record(Box::new(values)))
    }

    /// Mark the field as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Accept an explicit `null`.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Value used when the field is absent. Implies optional.
    pub fn default(mut self, value: Value) -> Self {
        self.required = false;
        self.default = Some(value);
        self
    }

    /// Restrict a string field to a fixed set of values.
    pub fn one_of(mut self, values: &[&'static str]) -> Self {
        self.allowed = Some(values.to_vec());
        self
    }

    /// Inclusive bounds: numeric value for numbers, character count for strings.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn describe(mut self, text: &'static str) -> Self {
        self.description = Some(text);
        self
    }
}

/// One validation failure: the offending field path and a readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub path: String,
    pub reason: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.reason)
        } else {
            write!(f, "{}: {}", self.path, self.reason)
        }
    }
}

/// Every failure found in one argument bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Input schema of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSchema {
    pub fields: Vec<Field>,
}

impl ToolSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Validate an argument bag.
    ///
    /// On success returns the normalized arguments: defaults filled in and
    /// undeclared keys removed. On failure returns every `(path, reason)`
    /// pair found; nothing is partially applied.
    pub fn validate(&self, args: &Value) -> Result<Map<String, Value>, ValidationErrors> {
        let empty = Map::new();
        let object = match args {
            Value::Null => &empty,
            Value::Object(map) => map,
            other => {
                return Err(ValidationErrors(vec![FieldError::new(
                    "",
                    format!("expected object, received {}", kind(other)),
                )]))
            }
        };

        let mut errors = Vec::new();
        let normalized = validate_fields(&self.fields, object, "", &mut errors);
        if errors.is_empty() {
            Ok(normalized)
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Render the schema as a JSON Schema object.
    pub fn to_json_schema(&self) -> Map<String, Value> {
        let mut schema = Map::new();
        schema.insert("$schema".into(), json!(JSON_SCHEMA_DRAFT));
        schema.extend(object_schema(&self.fields));
        schema
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn validate_fields(
    fields: &[Field],
    object: &Map<String, Value>,
    prefix: &str,
    errors: &mut Vec<FieldError>,
) -> Map<String, Value> {
    let mut out = Map::new();

    for field in fields {
        let path = join_path(prefix, field.name);
        match object.get(field.name) {
            Some(Value::Null) if field.nullable => {
                out.insert(field.name.to_string(), Value::Null);
            }
            // Optional fields treat an explicit null like absence.
            None | Some(Value::Null) => {
                if let Some(default) = &field.default {
                    out.insert(field.name.to_string(), default.clone());
                } else if field.required {
                    errors.push(FieldError::new(path, "is required"));
                }
            }
            Some(value) => {
                let before = errors.len();
                if let Some(checked) = check_value(&field.ty, value, &path, errors) {
                    check_rules(field, &checked, &path, errors);
                    if errors.len() == before {
                        out.insert(field.name.to_string(), checked);
                    }
                }
            }
        }
    }

    out
}

fn check_value(
    ty: &FieldType,
    value: &Value,
    path: &str,
    errors: &mut Vec<FieldError>,
) -> Option<Value> {
    let mismatch = |expected: &str, errors: &mut Vec<FieldError>| {
        errors.push(FieldError::new(
            path,
            format!("expected {}, received {}", expected, kind(value)),
        ));
        None
    };

    match ty {
        FieldType::String => match value {
            Value::String(_) => Some(value.clone()),
            _ => mismatch("string", errors),
        },
        FieldType::Integer => match as_integer(value) {
            Some(n) => Some(n),
            None => mismatch("integer", errors),
        },
        FieldType::Boolean => match value {
            Value::Bool(_) => Some(value.clone()),
            _ => mismatch("boolean", errors),
        },
        FieldType::StringOrInteger => match value {
            Value::String(_) => Some(value.clone()),
            _ => match as_integer(value) {
                Some(n) => Some(n),
                None => mismatch("string or integer", errors),
            },
        },
        FieldType::Array(items) => match value {
            Value::Array(elements) => {
                let before = errors.len();
                let checked: Vec<Value> = elements
                    .iter()
                    .enumerate()
                    .filter_map(|(i, element)| {
                        check_value(items, element, &format!("{}[{}]", path, i), errors)
                    })
                    .collect();
                (errors.len() == before).then_some(Value::Array(checked))
            }
            _ => mismatch("array", errors),
        },
        FieldType::Object(fields) => match value {
            Value::Object(map) => {
                let before = errors.len();
                let checked = validate_fields(fields, map, path, errors);
                (errors.len() == before).then_some(Value::Object(checked))
            }
            _ => mismatch("object", errors),
        },
        FieldType::AnyObject => match value {
            Value::Object(_) => Some(value.clone()),
            _ => mismatch("object", errors),
        },
        FieldType::Record(values) => match value {
            Value::Object(map) => {
                let before = errors.len();
                let mut checked = Map::new();
                for (key, entry) in map {
                    let entry_path = join_path(path, key);
                    if let Some(v) = check_value(values, entry, &entry_path, errors) {
                        checked.insert(key.clone(), v);
                    }
                }
                (errors.len() == before).then_some(Value::Object(checked))
            }
            _ => mismatch("object", errors),
        },
    }
}

/// Accept integral JSON numbers, including `42.0` sent by loose clients.
fn as_integer(value: &Value) -> Option<Value> {
    let Value::Number(n) = value else {
        return None;
    };
    if n.is_i64() || n.is_u64() {
        return Some(value.clone());
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| json!(f as i64))
}

fn check_rules(field: &Field, value: &Value, path: &str, errors: &mut Vec<FieldError>) {
    if let (Some(allowed), Some(s)) = (&field.allowed, value.as_str()) {
        if !allowed.contains(&s) {
            errors.push(FieldError::new(
                path,
                format!("must be one of: {}", allowed.join(", ")),
            ));
            return;
        }
    }

    let measured = match value {
        Value::String(s) => Some((s.chars().count() as f64, " characters")),
        Value::Number(n) => n.as_f64().map(|f| (f, "")),
        _ => None,
    };
    if let Some((size, unit)) = measured {
        if let Some(min) = field.min.filter(|min| size < *min as f64) {
            errors.push(FieldError::new(
                path,
                format!("must be at least {}{}", min, unit),
            ));
        } else if let Some(max) = field.max.filter(|max| size > *max as f64) {
            errors.push(FieldError::new(
                path,
                format!("must be at most {}{}", max, unit),
            ));
        }
    }
}

fn object_schema(fields: &[Field]) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in fields {
        properties.insert(field.name.to_string(), Value::Object(field_schema(field)));
        if field.required {
            required.push(json!(field.name));
        }
    }

    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".into(), Value::Array(required));
    }
    schema.insert("additionalProperties".into(), json!(false));
    schema
}

fn type_schema(ty: &FieldType) -> Map<String, Value> {
    let mut schema = Map::new();
    match ty {
        FieldType::String => {
            schema.insert("type".into(), json!("string"));
        }
        FieldType::Integer => {
            schema.insert("type".into(), json!("integer"));
        }
        FieldType::Boolean => {
            schema.insert("type".into(), json!("boolean"));
        }
        FieldType::StringOrInteger => {
            schema.insert("type".into(), json!(["string", "integer"]));
        }
        FieldType::Array(items) => {
            schema.insert("type".into(), json!("array"));
            schema.insert("items".into(), Value::Object(type_schema(items)));
        }
        FieldType::Object(fields) => {
            schema = object_schema(fields);
        }
        FieldType::AnyObject => {
            schema.insert("type".into(), json!("object"));
            schema.insert("additionalProperties".into(), json!({}));
        }
        FieldType::Record(values) => {
            schema.insert("type".into(), json!("object"));
            schema.insert(
                "additionalProperties".into(),
                Value::Object(type_schema(values)),
            );
        }
    }
    schema
}

fn field_schema(field: &Field) -> Map<String, Value> {
    let mut schema = type_schema(&field.ty);

    if field.nullable {
        let widened = match schema.get("type") {
            Some(Value::String(t)) => Some(json!([t, "null"])),
            Some(Value::Array(types)) => {
                let mut types = types.clone();
                types.push(json!("null"));
                Some(Value::Array(types))
            }
            _ => None,
        };
        if let Some(types) = widened {
            schema.insert("type".into(), types);
        }
    }
    if let Some(allowed) = &field.allowed {
        schema.insert("enum".into(), json!(allowed));
    }
    if let Some(default) = &field.default {
        schema.insert("default".into(), default.clone());
    }

    let (min_key, max_key) = match field.ty {
        FieldType::String => ("minLength", "maxLength"),
        _ => ("minimum", "maximum"),
    };
    if let Some(min) = field.min {
        schema.insert(min_key.into(), json!(min));
    }
    if let Some(max) = field.max {
        schema.insert(max_key.into(), json!(max));
    }
    if let Some(description) = field.description {
        schema.insert("description".into(), json!(description));
    }
    schema
}
