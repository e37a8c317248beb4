use serde_json::{Map, Value};

/// Strip `null` entries from tool arguments before they leave the process.
///
/// Object keys holding `null` are removed recursively, as are `null` array
/// elements. Nested arrays and objects left empty are dropped from their
/// parent, whether or not they were empty to begin with. `0`, `false` and
/// `""` are kept, and the top-level value is always returned.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(sanitize_items(items)),
        other => other.clone(),
    }
}

fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::new();
    for (key, value) in map {
        if let Some(clean) = sanitize_child(value) {
            out.insert(key.clone(), clean);
        }
    }
    out
}

fn sanitize_items(items: &[Value]) -> Vec<Value> {
    items.iter().filter_map(sanitize_child).collect()
}

fn sanitize_child(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let clean = sanitize_map(map);
            (!clean.is_empty()).then_some(Value::Object(clean))
        }
        Value::Array(items) => {
            let clean = sanitize_items(items);
            (!clean.is_empty()).then_some(Value::Array(clean))
        }
        other => Some(other.clone()),
    }
}
