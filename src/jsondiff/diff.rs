// Edit-script computation.
//
// Walks the two documents in parallel. For each container: recursive
// change ops first, then a single `add` for new children, then a single
// `remove` for vanished ones. Array tails are added ascending and removed
// descending so every index is valid at its own apply time.

use serde_json::{Map, Value};

use super::{patch, DiffOp, PathSeg};

/// Compute an edit script that transforms `prev` into `curr`.
///
/// The result is self-verified: the script is applied to `prev` and the
/// outcome compared to `curr` by compact serialization. Any mismatch
/// (key-order-only drift is invisible to structural comparison, for one)
/// falls back to a whole-document `change`, so `diff` never fails and
/// `patch(prev, diff(prev, curr))` always serializes identically to `curr`.
pub fn diff(prev: &Value, curr: &Value) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    diff_value(&mut Vec::new(), prev, curr, &mut ops);

    if verifies(prev, curr, &ops) {
        ops
    } else {
        vec![DiffOp::Change {
            path: Vec::new(),
            old: prev.clone(),
            new: curr.clone(),
        }]
    }
}

fn verifies(prev: &Value, curr: &Value, ops: &[DiffOp]) -> bool {
    let patched = match patch(prev, ops) {
        Ok(patched) => patched,
        Err(_) => return false,
    };
    match (serde_json::to_vec(&patched), serde_json::to_vec(curr)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn diff_value(path: &mut Vec<PathSeg>, prev: &Value, curr: &Value, ops: &mut Vec<DiffOp>) {
    match (prev, curr) {
        (Value::Object(po), Value::Object(co)) => diff_object(path, po, co, ops),
        (Value::Array(pa), Value::Array(ca)) => diff_array(path, pa, ca, ops),
        _ => {
            if prev != curr {
                ops.push(DiffOp::Change {
                    path: path.clone(),
                    old: prev.clone(),
                    new: curr.clone(),
                });
            }
        }
    }
}

fn diff_object(
    path: &mut Vec<PathSeg>,
    prev: &Map<String, Value>,
    curr: &Map<String, Value>,
    ops: &mut Vec<DiffOp>,
) {
    for (key, pv) in prev {
        if let Some(cv) = curr.get(key) {
            if pv != cv {
                path.push(PathSeg::Key(key.clone()));
                diff_value(path, pv, cv, ops);
                path.pop();
            }
        }
    }

    let added: Vec<_> = curr
        .iter()
        .filter(|(key, _)| !prev.contains_key(*key))
        .map(|(key, value)| (PathSeg::Key(key.clone()), value.clone()))
        .collect();
    if !added.is_empty() {
        ops.push(DiffOp::Add {
            path: path.clone(),
            entries: added,
        });
    }

    let removed: Vec<_> = prev
        .iter()
        .filter(|(key, _)| !curr.contains_key(*key))
        .map(|(key, value)| (PathSeg::Key(key.clone()), value.clone()))
        .collect();
    if !removed.is_empty() {
        ops.push(DiffOp::Remove {
            path: path.clone(),
            entries: removed,
        });
    }
}

fn diff_array(path: &mut Vec<PathSeg>, prev: &[Value], curr: &[Value], ops: &mut Vec<DiffOp>) {
    let common = prev.len().min(curr.len());
    for i in 0..common {
        if prev[i] != curr[i] {
            path.push(PathSeg::Index(i));
            diff_value(path, &prev[i], &curr[i], ops);
            path.pop();
        }
    }

    if curr.len() > common {
        ops.push(DiffOp::Add {
            path: path.clone(),
            entries: (common..curr.len())
                .map(|i| (PathSeg::Index(i), curr[i].clone()))
                .collect(),
        });
    }

    if prev.len() > common {
        ops.push(DiffOp::Remove {
            path: path.clone(),
            entries: (common..prev.len())
                .rev()
                .map(|i| (PathSeg::Index(i), prev[i].clone()))
                .collect(),
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn roundtrip(prev: Value, curr: Value) -> Vec<DiffOp> {
        let ops = diff(&prev, &curr);
        let patched = patch(&prev, &ops).unwrap();
        assert_eq!(
            serde_json::to_string(&patched).unwrap(),
            serde_json::to_string(&curr).unwrap(),
            "ops={ops:?}"
        );
        ops
    }

    #[test]
    fn equal_documents_diff_to_empty_script() {
        let doc = json!({"a": 1, "b": [1, 2, {"c": null}]});
        assert!(diff(&doc, &doc.clone()).is_empty());
    }

    #[test]
    fn from_empty_object_is_one_add() {
        let ops = roundtrip(json!({}), json!({"a": 1, "b": [true]}));
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], DiffOp::Add { path, entries } if path.is_empty() && entries.len() == 2));
    }

    #[test]
    fn leaf_change_is_recursive() {
        let ops = roundtrip(
            json!({"state": {"ticks": 1, "flags": 0}}),
            json!({"state": {"ticks": 2, "flags": 0}}),
        );
        assert_eq!(ops.len(), 1);
        assert!(matches!(
            &ops[0],
            DiffOp::Change { path, .. }
                if path == &[PathSeg::Key("state".into()), PathSeg::Key("ticks".into())]
        ));
    }

    #[test]
    fn type_flip_is_a_change() {
        roundtrip(json!({"a": [1, 2]}), json!({"a": {"k": 1}}));
        roundtrip(json!({"a": 1}), json!({"a": [1]}));
    }

    #[test]
    fn array_growth_and_shrink() {
        roundtrip(json!({"xs": [1, 2]}), json!({"xs": [1, 2, 3, 4]}));
        roundtrip(json!({"xs": [1, 2, 3, 4]}), json!({"xs": [1]}));
        roundtrip(json!({"xs": [1, 2, 3]}), json!({"xs": []}));
        roundtrip(json!({"xs": []}), json!({"xs": [7]}));
    }

    #[test]
    fn array_shrink_removes_descending() {
        let ops = diff(&json!([1, 2, 3, 4]), &json!([1]));
        match &ops[0] {
            DiffOp::Remove { entries, .. } => {
                let indices: Vec<_> = entries
                    .iter()
                    .map(|(seg, _)| match seg {
                        PathSeg::Index(i) => *i,
                        PathSeg::Key(_) => unreachable!(),
                    })
                    .collect();
                assert_eq!(indices, vec![3, 2, 1]);
            }
            other => panic!("expected remove, got {other:?}"),
        }
    }

    #[test]
    fn mixed_edits_in_one_container() {
        roundtrip(
            json!({"keep": 1, "mutate": "a", "drop": true}),
            json!({"keep": 1, "mutate": "b", "grow": [0]}),
        );
    }

    #[test]
    fn nested_region_descriptors() {
        roundtrip(
            json!({"buffer_infos": [{"offset": 0, "length": 128}], "state": [1, [2]]}),
            json!({"buffer_infos": [{"offset": 0, "length": 256}, {"offset": 256, "length": 64}], "state": [1, [3]]}),
        );
    }

    #[test]
    fn key_order_drift_falls_back_to_document_change() {
        // Structurally equal but serialized differently; the self-check
        // must catch it and replace the whole document.
        let prev: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let curr: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        let ops = diff(&prev, &curr);
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], DiffOp::Change { path, .. } if path.is_empty()));
        let patched = patch(&prev, &ops).unwrap();
        assert_eq!(
            serde_json::to_string(&patched).unwrap(),
            serde_json::to_string(&curr).unwrap()
        );
    }

    #[test]
    fn non_object_roots() {
        roundtrip(json!(null), json!({"a": 1}));
        roundtrip(json!([1, 2]), json!([2, 2, 2]));
        roundtrip(json!("x"), json!("y"));
    }
}
