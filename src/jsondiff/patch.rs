// Edit-script application.

use serde_json::Value;

use super::{DiffOp, PatchError, PathSeg};

/// Apply an edit script to `prev`, producing the patched document.
///
/// Operations apply strictly in list order; the first failure aborts.
pub fn patch(prev: &Value, ops: &[DiffOp]) -> Result<Value, PatchError> {
    let mut doc = prev.clone();
    for op in ops {
        apply(&mut doc, op)?;
    }
    Ok(doc)
}

fn apply(doc: &mut Value, op: &DiffOp) -> Result<(), PatchError> {
    match op {
        DiffOp::Add { path, entries } => {
            let target = locate(doc, path)?;
            for (key, value) in entries {
                insert(target, key, value.clone())?;
            }
            Ok(())
        }
        DiffOp::Remove { path, entries } => {
            let target = locate(doc, path)?;
            for (key, _) in entries {
                remove(target, key)?;
            }
            Ok(())
        }
        DiffOp::Change { path, new, .. } => {
            *locate(doc, path)? = new.clone();
            Ok(())
        }
    }
}

/// Walk `path` down the document, yielding the addressed value.
fn locate<'a>(doc: &'a mut Value, path: &[PathSeg]) -> Result<&'a mut Value, PatchError> {
    let mut node = doc;
    for seg in path {
        node = match (seg, node) {
            (PathSeg::Key(key), Value::Object(map)) => map
                .get_mut(key)
                .ok_or_else(|| PatchError::MissingKey(key.clone()))?,
            (PathSeg::Index(index), Value::Array(arr)) => {
                let len = arr.len();
                arr.get_mut(*index)
                    .ok_or(PatchError::BadIndex { index: *index, len })?
            }
            (PathSeg::Key(key), _) => {
                return Err(PatchError::TypeMismatch(format!(
                    "key `{key}` addressed into a non-object"
                )))
            }
            (PathSeg::Index(index), _) => {
                return Err(PatchError::TypeMismatch(format!(
                    "index {index} addressed into a non-array"
                )))
            }
        };
    }
    Ok(node)
}

fn insert(target: &mut Value, key: &PathSeg, value: Value) -> Result<(), PatchError> {
    match (key, target) {
        (PathSeg::Key(key), Value::Object(map)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (PathSeg::Index(index), Value::Array(arr)) => {
            if *index > arr.len() {
                return Err(PatchError::BadIndex {
                    index: *index,
                    len: arr.len(),
                });
            }
            arr.insert(*index, value);
            Ok(())
        }
        (PathSeg::Key(_), _) => Err(PatchError::TypeMismatch("add of a key into a non-object".into())),
        (PathSeg::Index(_), _) => Err(PatchError::TypeMismatch("add of an index into a non-array".into())),
    }
}

fn remove(target: &mut Value, key: &PathSeg) -> Result<(), PatchError> {
    match (key, target) {
        (PathSeg::Key(key), Value::Object(map)) => map
            .shift_remove(key)
            .map(drop)
            .ok_or_else(|| PatchError::MissingKey(key.clone())),
        (PathSeg::Index(index), Value::Array(arr)) => {
            if *index >= arr.len() {
                return Err(PatchError::BadIndex {
                    index: *index,
                    len: arr.len(),
                });
            }
            arr.remove(*index);
            Ok(())
        }
        (PathSeg::Key(_), _) => Err(PatchError::TypeMismatch("remove of a key from a non-object".into())),
        (PathSeg::Index(_), _) => Err(PatchError::TypeMismatch("remove of an index from a non-array".into())),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(k: &str) -> PathSeg {
        PathSeg::Key(k.into())
    }

    #[test]
    fn add_preserves_listed_order() {
        let ops = vec![DiffOp::Add {
            path: vec![],
            entries: vec![(key("b"), json!(2)), (key("a"), json!(1))],
        }];
        let patched = patch(&json!({}), &ops).unwrap();
        assert_eq!(serde_json::to_string(&patched).unwrap(), r#"{"b":2,"a":1}"#);
    }

    #[test]
    fn object_remove_preserves_order_of_survivors() {
        let prev: Value = serde_json::from_str(r#"{"a":1,"b":2,"c":3}"#).unwrap();
        let ops = vec![DiffOp::Remove {
            path: vec![],
            entries: vec![(key("b"), json!(2))],
        }];
        let patched = patch(&prev, &ops).unwrap();
        assert_eq!(serde_json::to_string(&patched).unwrap(), r#"{"a":1,"c":3}"#);
    }

    #[test]
    fn array_insert_at_end_is_push() {
        let ops = vec![DiffOp::Add {
            path: vec![key("xs")],
            entries: vec![(PathSeg::Index(2), json!(3)), (PathSeg::Index(3), json!(4))],
        }];
        let patched = patch(&json!({"xs": [1, 2]}), &ops).unwrap();
        assert_eq!(patched, json!({"xs": [1, 2, 3, 4]}));
    }

    #[test]
    fn array_remove_descending_indices() {
        let ops = vec![DiffOp::Remove {
            path: vec![],
            entries: vec![(PathSeg::Index(2), json!(3)), (PathSeg::Index(1), json!(2))],
        }];
        let patched = patch(&json!([1, 2, 3]), &ops).unwrap();
        assert_eq!(patched, json!([1]));
    }

    #[test]
    fn change_at_empty_path_replaces_document() {
        let ops = vec![DiffOp::Change {
            path: vec![],
            old: json!({}),
            new: json!({"fresh": true}),
        }];
        assert_eq!(patch(&json!({"stale": 1}), &ops).unwrap(), json!({"fresh": true}));
    }

    #[test]
    fn deep_change() {
        let ops = vec![DiffOp::Change {
            path: vec![key("a"), PathSeg::Index(1), key("b")],
            old: json!(0),
            new: json!(9),
        }];
        let patched = patch(&json!({"a": [null, {"b": 0}]}), &ops).unwrap();
        assert_eq!(patched, json!({"a": [null, {"b": 9}]}));
    }

    #[test]
    fn missing_key_fails() {
        let ops = vec![DiffOp::Change {
            path: vec![key("absent")],
            old: json!(0),
            new: json!(1),
        }];
        assert_eq!(
            patch(&json!({}), &ops),
            Err(PatchError::MissingKey("absent".into()))
        );
    }

    #[test]
    fn bad_array_index_fails() {
        let ops = vec![DiffOp::Add {
            path: vec![],
            entries: vec![(PathSeg::Index(5), json!(0))],
        }];
        assert_eq!(
            patch(&json!([1]), &ops),
            Err(PatchError::BadIndex { index: 5, len: 1 })
        );

        let ops = vec![DiffOp::Remove {
            path: vec![],
            entries: vec![(PathSeg::Index(1), json!(0))],
        }];
        assert_eq!(
            patch(&json!([1]), &ops),
            Err(PatchError::BadIndex { index: 1, len: 1 })
        );
    }

    #[test]
    fn path_through_leaf_fails() {
        let ops = vec![DiffOp::Change {
            path: vec![key("a"), key("b")],
            old: json!(0),
            new: json!(1),
        }];
        assert!(matches!(
            patch(&json!({"a": 3}), &ops),
            Err(PatchError::TypeMismatch(_))
        ));
    }

    #[test]
    fn ops_apply_in_order() {
        // Add a container, then edit inside it.
        let ops = vec![
            DiffOp::Add {
                path: vec![],
                entries: vec![(key("xs"), json!([]))],
            },
            DiffOp::Add {
                path: vec![key("xs")],
                entries: vec![(PathSeg::Index(0), json!("v"))],
            },
        ];
        assert_eq!(patch(&json!({}), &ops).unwrap(), json!({"xs": ["v"]}));
    }
}
