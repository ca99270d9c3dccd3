//! Dot-separated keypath access into a [`DataSet`].
//!
//! The first segment addresses a top-level field; any remaining
//! segments descend through nested JSON objects. `set` auto-vivifies
//! intermediate objects, replacing whatever non-object value was in
//! the way. Missing segments never panic — `get` returns `None`.

use serde_json::{Map, Value};

use crate::value::{DataSet, Field};

/// Read the value at `path`, or `None` if any segment is absent.
///
/// A formatter field has no JSON value, so a path landing on (or
/// descending through) one resolves to `None`.
pub fn get<'a>(data: &'a DataSet, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let head = segments.next()?;
    let mut current = data.field(head)?.as_value()?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate objects as needed.
pub fn set(data: &mut DataSet, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            data.insert(path, Field::Value(value));
        }
        Some((head, rest)) => {
            let object_at_head =
                matches!(data.field(head), Some(Field::Value(v)) if v.is_object());
            if !object_at_head {
                data.insert(head, Field::Value(Value::Object(Map::new())));
            }
            if let Some(Field::Value(root)) = data.field_mut(head) {
                set_value(root, rest, value);
            }
        }
    }
}

fn set_value(target: &mut Value, path: &str, value: Value) {
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Some(map) = target.as_object_mut() else {
        return;
    };
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_value(child, rest, value);
        }
    }
}

/// Check whether something exists at `path`.
///
/// This is a genuine existence check on the tree — no sentinel value
/// is involved, so stored data can never collide with it. A top-level
/// formatter field counts as existing even though it has no JSON value.
pub fn has(data: &DataSet, path: &str) -> bool {
    match path.split_once('.') {
        None => data.field(path).is_some(),
        Some(_) => get(data, path).is_some(),
    }
}
