//! Deep merge of configuration trees.
//!
//! Mappings merge key-by-key recursively. Everything else (sequences,
//! scalars, null) at a matching key is replaced wholesale by the
//! higher-precedence value; sequences are never concatenated.

use serde_json::{Map, Value};

/// Deep merge `overlay` onto `base` in place, with `overlay` taking precedence.
///
/// # Example
/// ```
/// use serde_json::json;
/// use configr::core::deep_merge;
///
/// let mut base = json!({"server": {"port": 8080, "host": "localhost"}, "tags": ["a", "b"]});
/// deep_merge(&mut base, json!({"server": {"port": 9000}, "tags": ["c"]}));
/// assert_eq!(base, json!({"server": {"port": 9000, "host": "localhost"}, "tags": ["c"]}));
/// ```
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merge values in order onto an empty mapping, later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Map::new()), |mut merged, value| {
            deep_merge(&mut merged, value);
            merged
        })
}

/// Whether a value carries no configuration (`null` or an empty mapping).
pub(crate) fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Look up a dotted path (`a.b.c`) in a configuration tree.
///
/// Numeric segments index into sequences.
pub fn lookup<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(config);
    }
    path.split('.').try_fold(config, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Set `value` at a dotted path, creating (or replacing non-mapping)
/// intermediate nodes with mappings.
pub(crate) fn set_path(config: &mut Value, path: &[&str], value: Value) {
    let Some((last, parents)) = path.split_last() else {
        *config = value;
        return;
    };

    let mut node = config;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(node).insert(last.to_string(), value);
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with a mapping"),
    }
}
