//! First-writer-wins deep merge.

use serde_json::Value;

/// Merge `incoming` into `acc`, where `acc` was written by higher-priority
/// fragments.
///
/// Scalar leaves already present are never overwritten. Maps merge
/// recursively; lists concatenate with the higher-priority elements first.
/// A type conflict (map vs scalar, etc.) keeps the higher-priority side.
pub fn deep_merge(acc: &mut Value, incoming: &Value) {
    match (acc, incoming) {
        (Value::Object(acc_map), Value::Object(incoming_map)) => {
            for (key, value) in incoming_map {
                match acc_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        acc_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(acc_list), Value::Array(incoming_list)) => {
            acc_list.extend(incoming_list.iter().cloned());
        }
        // First writer wins.
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scalars_keep_the_first_writer() {
        let mut acc = json!({"Page": {"cache": true}});
        deep_merge(&mut acc, &json!({"Page": {"cache": false, "ttl": 60}}));
        assert_eq!(acc, json!({"Page": {"cache": true, "ttl": 60}}));
    }

    #[test]
    fn maps_merge_structurally() {
        let mut acc = json!({"Page": {"db": {"Title": "Varchar"}}});
        deep_merge(&mut acc, &json!({"Page": {"db": {"Sort": "Int"}}}));
        assert_eq!(
            acc,
            json!({"Page": {"db": {"Title": "Varchar", "Sort": "Int"}}})
        );
    }

    #[test]
    fn lists_concatenate_priority_first() {
        let mut acc = json!({"Page": {"extensions": ["A"]}});
        deep_merge(&mut acc, &json!({"Page": {"extensions": ["B", "C"]}}));
        assert_eq!(acc, json!({"Page": {"extensions": ["A", "B", "C"]}}));
    }

    #[test]
    fn type_conflicts_keep_the_first_writer() {
        let mut acc = json!({"Page": {"db": "scalar"}});
        deep_merge(&mut acc, &json!({"Page": {"db": {"Sort": "Int"}}}));
        assert_eq!(acc, json!({"Page": {"db": "scalar"}}));
    }

    #[test]
    fn merging_twice_is_idempotent_over_maps() {
        let base = json!({"Page": {"db": {"Title": "Varchar"}}});
        let incoming = json!({"Page": {"db": {"Sort": "Int"}, "cache": 1}});
        let mut once = base.clone();
        deep_merge(&mut once, &incoming);
        let mut twice = once.clone();
        deep_merge(&mut twice, &incoming);
        // Lists aside, re-merging the same fragment changes nothing.
        assert_eq!(once, twice);
    }
}
