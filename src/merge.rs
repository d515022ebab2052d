//! Layered deep merge of JSON configuration trees.
//!
//! [`merge`] overlays any number of partial configuration layers onto a
//! default tree:
//!
//! - `null` layers are skipped.
//! - An object layer turns the destination into an object (discarding a
//!   scalar or array that was there) and merges key by key.
//! - An array layer does the same for arrays, merging index by index.
//! - A scalar layer replaces the destination.
//!
//! Array-valued keys are special: every element of the incoming array is
//! merged against the *same* destination value at that key, so
//! `{"k": {"x": 0}}` merged with `{"k": [{"x": 1}, {"y": 2}]}` yields
//! `{"k": [{"x": 1}, {"x": 0, "y": 2}]}`.
//!
//! The merge is pure: the destination is taken by value, sources are only
//! read, and no subtree of a source is shared with the result.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Key that is never copied from a source into the result.
const PROTO_KEY: &str = "__proto__";

/// Merges `sources` left to right onto `destination`.
///
/// `merge(merge(d, &[a]), &[b])` is equal to `merge(d, &[a, b])`.
pub fn merge(destination: Value, sources: &[Value]) -> Value {
    sources.iter().fold(destination, merge_one)
}

/// Merges configuration layers onto `defaults` and deserializes the result.
///
/// `defaults` is cloned, so a shared template can be reused across
/// instances.
pub fn merge_layers<T: DeserializeOwned>(
    defaults: &Value,
    layers: &[Value],
) -> Result<T, serde_json::Error> {
    serde_json::from_value(merge(defaults.clone(), layers))
}

fn merge_one(destination: Value, source: &Value) -> Value {
    match source {
        Value::Null => destination,
        Value::Object(entries) => {
            let mut target = match destination {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            for (key, value) in entries {
                if key == PROTO_KEY {
                    continue;
                }
                let current = target.remove(key);
                if let Some(merged) = merge_entry(current, value) {
                    target.insert(key.clone(), merged);
                }
            }
            Value::Object(target)
        }
        Value::Array(items) => {
            let mut target = match destination {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            for (index, value) in items.iter().enumerate() {
                let current = target.get_mut(index).map(Value::take);
                let merged = merge_entry(current, value).unwrap_or(Value::Null);
                match target.get_mut(index) {
                    Some(slot) => *slot = merged,
                    None => target.push(merged),
                }
            }
            Value::Array(target)
        }
        scalar => scalar.clone(),
    }
}

/// Merges one keyed entry. Returns `None` when the key should stay absent.
fn merge_entry(current: Option<Value>, value: &Value) -> Option<Value> {
    match value {
        Value::Array(elements) => {
            let baseline = current.unwrap_or(Value::Null);
            Some(Value::Array(
                elements
                    .iter()
                    .map(|element| merge_one(baseline.clone(), element))
                    .collect(),
            ))
        }
        Value::Null => current,
        _ => Some(merge_one(current.unwrap_or(Value::Null), value)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn overlays_partial_object() {
        let defaults = json!({"a": 1, "b": 2, "nested": {"x": 1, "y": 2}});
        let merged = merge(defaults, &[json!({"b": 3, "nested": {"y": 5}})]);
        assert_eq!(merged, json!({"a": 1, "b": 3, "nested": {"x": 1, "y": 5}}));
    }

    #[test]
    fn identical_values_leave_defaults_intact() {
        let defaults = json!({"a": 1, "b": 2});
        let snapshot = defaults.clone();
        let merged = merge(defaults.clone(), &[json!({"a": 1})]);
        assert_eq!(merged, json!({"a": 1, "b": 2}));
        assert_eq!(defaults, snapshot);
    }

    #[test]
    fn null_source_is_skipped() {
        let merged = merge(json!({"a": 1}), &[Value::Null, json!({"b": 2}), Value::Null]);
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn null_entry_keeps_destination_value() {
        let merged = merge(json!({"a": 1}), &[json!({"a": null, "b": null})]);
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn scalar_source_replaces_destination() {
        assert_eq!(merge(json!({"a": 1}), &[json!(5)]), json!(5));
        assert_eq!(merge(json!({"a": {"b": 1}}), &[json!({"a": "flat"})]), json!({"a": "flat"}));
    }

    #[test]
    fn type_mismatch_coerces_destination() {
        assert_eq!(merge(json!([1, 2]), &[json!({"a": 1})]), json!({"a": 1}));
        assert_eq!(merge(json!({"a": 1}), &[json!([3])]), json!([3]));
        assert_eq!(merge(json!("text"), &[json!({"a": 1})]), json!({"a": 1}));
    }

    #[test]
    fn top_level_arrays_merge_by_index() {
        let merged = merge(json!([{"a": 1}, {"b": 2}, 3]), &[json!([{"c": 4}])]);
        assert_eq!(merged, json!([{"a": 1, "c": 4}, {"b": 2}, 3]));
    }

    #[test]
    fn proto_key_is_never_copied() {
        let merged = merge(
            json!({"a": 1}),
            &[json!({"__proto__": {"polluted": true}, "inner": {"__proto__": 1, "ok": 2}})],
        );
        assert_eq!(merged, json!({"a": 1, "inner": {"ok": 2}}));
    }

    #[test]
    fn array_elements_share_one_baseline() {
        let destination = json!({"k": {"x": 0, "keep": true}});
        let merged = merge(destination, &[json!({"k": [{"x": 1}, {"y": 2}]})]);

        let items = merged["k"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], json!({"x": 1, "keep": true}));
        // The second element does not see the first element's x
        assert_eq!(items[1], json!({"x": 0, "keep": true, "y": 2}));
    }

    #[test]
    fn array_key_is_not_index_aligned() {
        let destination = json!({"k": [{"a": 1}, {"b": 2}, {"c": 3}]});
        let merged = merge(destination, &[json!({"k": [{"z": 9}]})]);
        // An array baseline coerces to an object for object elements
        assert_eq!(merged, json!({"k": [{"z": 9}]}));
    }

    #[test]
    fn array_key_against_missing_baseline() {
        let merged = merge(json!({}), &[json!({"images": [{"src": "a.png"}, {"src": "b.png"}]})]);
        assert_eq!(merged, json!({"images": [{"src": "a.png"}, {"src": "b.png"}]}));
    }

    #[test]
    fn merge_layers_deserializes() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Sample {
            count: u32,
            name: String,
        }

        let defaults = json!({"count": 10, "name": "default"});
        let sample: Sample = merge_layers(&defaults, &[json!({"count": 3})]).unwrap();
        assert_eq!(
            sample,
            Sample {
                count: 3,
                name: "default".into()
            }
        );
        assert_eq!(defaults["count"], 10);
    }

    fn json_tree() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::from),
            (-100i64..100).prop_map(Value::from),
            "[a-z]{0,4}".prop_map(Value::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]|__proto__", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn contains_proto(value: &Value) -> bool {
        match value {
            Value::Object(map) => map.contains_key(PROTO_KEY) || map.values().any(contains_proto),
            Value::Array(items) => items.iter().any(contains_proto),
            _ => false,
        }
    }

    proptest! {
        #[test]
        fn merge_is_left_to_right(d in json_tree(), a in json_tree(), b in json_tree()) {
            let stepwise = merge(merge(d.clone(), &[a.clone()]), &[b.clone()]);
            let at_once = merge(d, &[a, b]);
            prop_assert_eq!(stepwise, at_once);
        }

        #[test]
        fn sources_are_not_mutated(d in json_tree(), a in json_tree()) {
            let snapshot = a.clone();
            let sources = [a];
            let _ = merge(d, &sources);
            prop_assert_eq!(&sources[0], &snapshot);
        }

        #[test]
        fn proto_never_reaches_result(a in json_tree(), b in json_tree()) {
            let merged = merge(json!({}), &[a, b]);
            prop_assert!(!contains_proto(&merged));
        }
    }
}
