use std::sync::Arc;

use serde_json::Value;

use crate::value::{DataSet, Field};

/// The deep-merge function used by compositions.
///
/// Applies `source` onto `target`, source winning conflicts. The
/// context holds one of these as a field so the algorithm can be
/// swapped out at construction; [`deep_merge`] is the default.
pub type MergeFn = Arc<dyn Fn(&mut DataSet, &DataSet) + Send + Sync>;

/// Default deep merge over data sets.
///
/// For each key in `source`:
/// - If both sides hold JSON objects, merge them recursively.
/// - Otherwise the source field replaces the target field wholesale —
///   scalars, arrays and formatters all shadow whatever was there.
///
/// Multiple sources are applied left-to-right by calling this once per
/// source, so the rightmost source wins scalar conflicts.
pub fn deep_merge(target: &mut DataSet, source: &DataSet) {
    for (key, incoming) in source.iter() {
        if let (Some(Field::Value(base)), Field::Value(patch)) = (target.field_mut(key), incoming)
        {
            if base.is_object() && patch.is_object() {
                merge_value(base, patch);
                continue;
            }
        }
        target.insert(key, incoming.clone());
    }
}

/// Recursively merge one JSON value onto another.
///
/// Object-onto-object merges field by field; any other combination
/// replaces `base` with a clone of `patch`. `null` is an ordinary
/// value here — it overrides, it does not delete.
pub fn merge_value(base: &mut Value, patch: &Value) {
    if let (Some(base_obj), Some(patch_obj)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_obj {
            if value.is_object() {
                let entry = base_obj.entry(key.clone()).or_insert(Value::Null);
                merge_value(entry, value);
            } else {
                base_obj.insert(key.clone(), value.clone());
            }
        }
    } else {
        *base = patch.clone();
    }
}
