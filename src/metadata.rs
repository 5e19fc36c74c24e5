//! Dot-path helpers over metadata documents.
//!
//! A dot path names one key at some depth of a nested metadata object, e.g.
//! `face.pose.yaw`. Only objects are walked; arrays and scalars are leaves.

use crate::types::Metadata;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Every dot path of `value`, in document order, parents before children.
///
/// Non-object values produce no paths.
pub fn extract_dot_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    if let Value::Object(map) = value {
        collect_paths(map, "", &mut paths);
    }
    paths
}

/// Dot paths of a metadata document.
pub fn metadata_paths(metadata: &Metadata) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths(metadata, "", &mut paths);
    paths
}

fn collect_paths(map: &Map<String, Value>, prefix: &str, out: &mut Vec<String>) {
    for (key, child) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        out.push(path.clone());
        if let Value::Object(inner) = child {
            collect_paths(inner, &path, out);
        }
    }
}

/// Union of the dot paths of many documents, deduplicated and sorted.
pub fn discover_paths<'a, I>(documents: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Metadata>,
{
    let mut all = BTreeSet::new();
    for doc in documents {
        let mut paths = Vec::new();
        collect_paths(doc, "", &mut paths);
        all.extend(paths);
    }
    all.into_iter().collect()
}

/// Split a dot path into its segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

/// Look up a nested value. Returns `None` if any segment is missing or a
/// non-object is reached before the last segment.
pub fn get_path<'a>(metadata: &'a Metadata, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = metadata.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// Write a nested value, creating (or overwriting non-object) intermediate
/// objects as needed.
pub fn set_path(metadata: &mut Metadata, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = metadata;
    for key in parents {
        let slot = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => unreachable!("slot was just made an object"),
        };
    }
    current.insert(last.to_string(), value);
}

/// True if `child` is a strict dot-descendant of `parent`
/// (`a.b` is a descendant of `a`, `ab` is not).
pub fn is_descendant(child: &str, parent: &str) -> bool {
    child.len() > parent.len() + 1
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'.'
}

/// Ancestor prefixes of a path, nearest-root first (`a.b.c` → `a`, `a.b`).
pub fn ancestors(path: &str) -> Vec<&str> {
    path.match_indices('.').map(|(i, _)| &path[..i]).collect()
}

/// Build a new document containing only the given paths' values.
/// Paths whose value is absent on `source` are omitted.
pub fn project(source: &Metadata, paths: &[String]) -> Metadata {
    let mut out = Metadata::new();
    for path in paths {
        let segments = split_path(path);
        if let Some(value) = get_path(source, &segments) {
            set_path(&mut out, &segments, value.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(value: Value) -> Metadata {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_extract_nested_paths() {
        let paths = extract_dot_paths(&json!({"a": {"b": 1, "c": {"d": 2}}, "e": [1, {"f": 2}]}));
        assert_eq!(paths, vec!["a", "a.b", "a.c", "a.c.d", "e"]);
    }

    #[test]
    fn test_arrays_are_leaves() {
        let paths = extract_dot_paths(&json!({"faces": [{"yaw": 1}]}));
        assert_eq!(paths, vec!["faces"]);
    }

    #[test]
    fn test_discover_unions_and_sorts() {
        let docs = vec![doc(json!({"z": 1, "a": {"b": 1}})), doc(json!({"a": {"c": 2}}))];
        assert_eq!(discover_paths(&docs), vec!["a", "a.b", "a.c", "z"]);
    }

    #[test]
    fn test_get_path() {
        let meta = doc(json!({"a": {"b": {"c": 5}}, "s": "x"}));
        assert_eq!(get_path(&meta, &["a", "b", "c"]), Some(&json!(5)));
        assert_eq!(get_path(&meta, &["a", "missing"]), None);
        assert_eq!(get_path(&meta, &["s", "deeper"]), None);
    }

    #[test]
    fn test_set_path_builds_structure() {
        let mut meta = Metadata::new();
        set_path(&mut meta, &["a", "b"], json!(1));
        set_path(&mut meta, &["a", "c"], json!(2));
        assert_eq!(Value::Object(meta), json!({"a": {"b": 1, "c": 2}}));
    }

    #[test]
    fn test_is_descendant() {
        assert!(is_descendant("a.b", "a"));
        assert!(is_descendant("a.b.c", "a.b"));
        assert!(!is_descendant("ab", "a"));
        assert!(!is_descendant("a", "a"));
        assert!(!is_descendant("b.a", "a"));
    }

    #[test]
    fn test_ancestors() {
        assert_eq!(ancestors("a.b.c"), vec!["a", "a.b"]);
        assert!(ancestors("a").is_empty());
    }

    #[test]
    fn test_project_omits_absent_values() {
        let meta = doc(json!({"a": {"b": 1, "c": 2}}));
        let projected = project(&meta, &["a.b".to_string(), "x.y".to_string()]);
        assert_eq!(Value::Object(projected), json!({"a": {"b": 1}}));
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i32>().prop_map(|n| json!(n)),
            "[a-z]{0,4}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
                prop::collection::btree_map("[a-c]{1,2}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_projecting_all_leaf_paths_is_identity(value in arb_json()) {
            let Value::Object(meta) = value else { return Ok(()); };
            let paths = metadata_paths(&meta);
            // leaf paths: those with no descendant in the set
            let leaves: Vec<String> = paths
                .iter()
                .filter(|p| !paths.iter().any(|q| is_descendant(q, p)))
                .cloned()
                .collect();
            let projected = project(&meta, &leaves);
            // empty nested objects have no leaf below them but are their own path
            prop_assert_eq!(Value::Object(projected), Value::Object(meta));
        }

        #[test]
        fn test_every_discovered_path_resolves(value in arb_json()) {
            let Value::Object(meta) = value else { return Ok(()); };
            for path in metadata_paths(&meta) {
                let segments = split_path(&path);
                prop_assert!(get_path(&meta, &segments).is_some(), "path {} should resolve", path);
            }
        }
    }
}
