//! Turns JSON Schema documents published by tools into argument validators.
//!
//! Tool servers publish schemas of wildly varying quality. Translation never
//! fails: anything this module does not understand becomes [`Validator::Any`],
//! so one exotic schema can never keep a tool out of the registry.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

/// Runtime validator and normalizer for tool arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    Any,
    Null,
    String,
    Number,
    Integer,
    Boolean,
    Enum(Vec<Value>),
    Const(Value),
    Array(Box<Validator>),
    Object(ObjectShape),
    /// Accepts a value matching at least one branch (`oneOf` / `anyOf`).
    Union(Vec<Validator>),
    /// Applies every branch in turn (`allOf` that could not be merged).
    All(Vec<Validator>),
    Nullable(Box<Validator>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectShape {
    pub properties: BTreeMap<String, Property>,
    pub additional: Additional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub validator: Validator,
    pub required: bool,
}

/// What to do with keys not listed in `properties`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Additional {
    #[default]
    Allow,
    Deny,
    Schema(Box<Validator>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Slash-separated location of the offending value, empty for the root.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for ValidationError {}

/// Build a validator for a tool's input schema.
///
/// A missing or empty schema yields a validator for an (open) empty object.
pub fn translate(schema: Option<&Value>) -> Validator {
    match schema {
        None | Some(Value::Null) => Validator::empty_object(),
        Some(Value::Object(map)) if map.is_empty() => Validator::empty_object(),
        Some(node) => translate_node(node),
    }
}

fn translate_node(node: &Value) -> Validator {
    let Value::Object(map) = node else {
        return Validator::Any;
    };

    let base = translate_kind(map);
    let nullable = map.contains_key("default") || map.get("nullable") == Some(&Value::Bool(true));
    if nullable { base.nullable() } else { base }
}

fn translate_kind(map: &Map<String, Value>) -> Validator {
    if let Some(value) = map.get("const") {
        return Validator::Const(value.clone());
    }
    if let Some(Value::Array(values)) = map.get("enum")
        && !values.is_empty()
    {
        return Validator::Enum(values.clone());
    }

    let mut parts = Vec::new();
    if let Some(typed) = translate_typed(map) {
        parts.push(typed);
    }
    for key in ["oneOf", "anyOf"] {
        if let Some(branches) = translate_branches(map, key) {
            parts.push(Validator::Union(branches));
        }
    }
    if let Some(branches) = translate_branches(map, "allOf") {
        parts.push(merge_all(branches));
    }

    match parts.len() {
        0 => Validator::Any,
        1 => parts.remove(0),
        _ => merge_all(parts),
    }
}

fn translate_typed(map: &Map<String, Value>) -> Option<Validator> {
    match map.get("type") {
        Some(Value::String(kind)) => Some(translate_type(kind, map)),
        Some(Value::Array(kinds)) => {
            let mut branches: Vec<Validator> = kinds
                .iter()
                .filter_map(Value::as_str)
                .map(|kind| translate_type(kind, map))
                .collect();
            match branches.len() {
                0 => None,
                1 => Some(branches.remove(0)),
                _ => Some(Validator::Union(branches)),
            }
        }
        _ if map.contains_key("properties") => Some(translate_object(map)),
        _ if map.contains_key("items") => Some(translate_array(map)),
        _ => None,
    }
}

fn translate_type(kind: &str, map: &Map<String, Value>) -> Validator {
    match kind {
        "string" => Validator::String,
        "number" => Validator::Number,
        "integer" => Validator::Integer,
        "boolean" => Validator::Boolean,
        "null" => Validator::Null,
        "array" => translate_array(map),
        "object" => translate_object(map),
        _ => Validator::Any,
    }
}

fn translate_array(map: &Map<String, Value>) -> Validator {
    let items = match map.get("items") {
        Some(node @ Value::Object(_)) => translate_node(node),
        // Tuple-form `items` and missing `items` both accept any element.
        _ => Validator::Any,
    };
    Validator::Array(Box::new(items))
}

fn translate_object(map: &Map<String, Value>) -> Validator {
    let required: Vec<&str> = match map.get("required") {
        Some(Value::Array(names)) => names.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    let properties = match map.get("properties") {
        Some(Value::Object(props)) => props
            .iter()
            .map(|(name, node)| {
                (
                    name.clone(),
                    Property {
                        validator: translate_node(node),
                        required: required.contains(&name.as_str()),
                    },
                )
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    let additional = match map.get("additionalProperties") {
        Some(Value::Bool(false)) => Additional::Deny,
        Some(Value::Object(node)) if !node.is_empty() => {
            Additional::Schema(Box::new(translate_node(&Value::Object(node.clone()))))
        }
        _ => Additional::Allow,
    };

    Validator::Object(ObjectShape {
        properties,
        additional,
    })
}

fn translate_branches(map: &Map<String, Value>, key: &str) -> Option<Vec<Validator>> {
    match map.get(key) {
        Some(Value::Array(nodes)) if !nodes.is_empty() => {
            Some(nodes.iter().map(translate_node).collect())
        }
        _ => None,
    }
}

/// Combine `allOf` branches. Object branches are merged into one shape so
/// that a strict branch does not reject keys contributed by its siblings.
fn merge_all(branches: Vec<Validator>) -> Validator {
    let mut branches: Vec<Validator> = branches
        .into_iter()
        .filter(|b| *b != Validator::Any)
        .collect();

    if branches.is_empty() {
        return Validator::Any;
    }
    if branches.len() == 1 {
        return branches.remove(0);
    }
    if !branches.iter().all(|b| matches!(b, Validator::Object(_))) {
        return Validator::All(branches);
    }

    let mut merged = ObjectShape::default();
    let mut any_deny = false;
    for branch in branches {
        let Validator::Object(shape) = branch else {
            continue;
        };
        match shape.additional {
            Additional::Deny => any_deny = true,
            Additional::Schema(schema) if merged.additional == Additional::Allow => {
                merged.additional = Additional::Schema(schema);
            }
            _ => {}
        }
        for (name, prop) in shape.properties {
            match merged.properties.remove(&name) {
                Some(existing) => {
                    let validator = if existing.validator == prop.validator {
                        existing.validator
                    } else {
                        Validator::All(vec![existing.validator, prop.validator])
                    };
                    merged.properties.insert(
                        name,
                        Property {
                            validator,
                            required: existing.required || prop.required,
                        },
                    );
                }
                None => {
                    merged.properties.insert(name, prop);
                }
            }
        }
    }
    if any_deny {
        merged.additional = Additional::Deny;
    }
    Validator::Object(merged)
}

impl Validator {
    pub fn empty_object() -> Self {
        Validator::Object(ObjectShape::default())
    }

    /// Wrap so that `null` is accepted as well.
    pub fn nullable(self) -> Self {
        if self.accepts_null() {
            self
        } else {
            Validator::Nullable(Box::new(self))
        }
    }

    pub fn accepts_null(&self) -> bool {
        match self {
            Validator::Any | Validator::Null | Validator::Nullable(_) => true,
            Validator::Enum(values) => values.contains(&Value::Null),
            Validator::Const(value) => value.is_null(),
            Validator::Union(branches) => branches.iter().any(Validator::accepts_null),
            Validator::All(branches) => branches.iter().all(Validator::accepts_null),
            _ => false,
        }
    }

    /// Check `value` and return its normalized form.
    ///
    /// Normalization turns whole floats into integers where an integer is
    /// expected and drops optional properties that were sent as `null`.
    pub fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        self.check(value, "")
    }

    fn check(&self, value: &Value, path: &str) -> Result<Value, ValidationError> {
        match self {
            Validator::Any => Ok(value.clone()),
            Validator::Null => match value {
                Value::Null => Ok(Value::Null),
                other => Err(expected(path, "null", other)),
            },
            Validator::String => match value {
                Value::String(_) => Ok(value.clone()),
                other => Err(expected(path, "string", other)),
            },
            Validator::Number => match value {
                Value::Number(_) => Ok(value.clone()),
                other => Err(expected(path, "number", other)),
            },
            Validator::Integer => check_integer(value, path),
            Validator::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                other => Err(expected(path, "boolean", other)),
            },
            Validator::Enum(values) => {
                if values.contains(value) {
                    Ok(value.clone())
                } else {
                    let allowed: Vec<String> = values.iter().map(Value::to_string).collect();
                    Err(error(
                        path,
                        format!("expected one of [{}], got {value}", allowed.join(", ")),
                    ))
                }
            }
            Validator::Const(expected_value) => {
                if expected_value == value {
                    Ok(value.clone())
                } else {
                    Err(error(path, format!("expected {expected_value}, got {value}")))
                }
            }
            Validator::Array(items) => match value {
                Value::Array(elements) => elements
                    .iter()
                    .enumerate()
                    .map(|(i, element)| items.check(element, &format!("{path}/{i}")))
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                other => Err(expected(path, "array", other)),
            },
            Validator::Object(shape) => shape.check(value, path),
            Validator::Union(branches) => {
                let mut first_error = None;
                for branch in branches {
                    match branch.check(value, path) {
                        Ok(normalized) => return Ok(normalized),
                        Err(e) => {
                            first_error.get_or_insert(e);
                        }
                    }
                }
                Err(match first_error {
                    Some(e) => error(path, format!("matched no allowed variant ({e})")),
                    None => error(path, "matched no allowed variant"),
                })
            }
            Validator::All(branches) => {
                let mut current = value.clone();
                for branch in branches {
                    current = branch.check(&current, path)?;
                }
                Ok(current)
            }
            Validator::Nullable(inner) => match value {
                Value::Null => Ok(Value::Null),
                other => inner.check(other, path),
            },
        }
    }
}

impl ObjectShape {
    fn check(&self, value: &Value, path: &str) -> Result<Value, ValidationError> {
        let Value::Object(map) = value else {
            return Err(expected(path, "object", value));
        };

        let mut out = Map::new();
        for (name, prop) in &self.properties {
            let child = format!("{path}/{name}");
            match map.get(name) {
                None if prop.required => {
                    return Err(error(&child, "required property is missing"));
                }
                None => {}
                Some(Value::Null) if !prop.required && !prop.validator.accepts_null() => {}
                Some(v) => {
                    out.insert(name.clone(), prop.validator.check(v, &child)?);
                }
            }
        }

        for (name, v) in map {
            if self.properties.contains_key(name) {
                continue;
            }
            match &self.additional {
                Additional::Allow => {
                    out.insert(name.clone(), v.clone());
                }
                Additional::Deny => {
                    return Err(error(
                        &format!("{path}/{name}"),
                        "property is not allowed",
                    ));
                }
                Additional::Schema(schema) => {
                    let normalized = schema.check(v, &format!("{path}/{name}"))?;
                    out.insert(name.clone(), normalized);
                }
            }
        }

        Ok(Value::Object(out))
    }
}

fn check_integer(value: &Value, path: &str) -> Result<Value, ValidationError> {
    // Largest float that still represents every integer exactly.
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;

    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_SAFE => {
                Ok(Value::from(f as i64))
            }
            _ => Err(expected(path, "integer", value)),
        },
        other => Err(expected(path, "integer", other)),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expected(path: &str, what: &str, got: &Value) -> ValidationError {
    error(path, format!("expected {what}, got {}", kind_of(got)))
}

fn error(path: &str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        path: path.to_string(),
        message: message.into(),
    }
}
