// Structural JSON diff/patch for save-state metadata.
//
// Info blocks evolve by small edits between frames, so each frame stores a
// structural edit script against the previous frame's parsed info instead
// of the full JSON. The script operates on parsed documents, never raw
// bytes; a textual diff would leak serializer whitespace and key-order
// drift into every patch.
//
// Edit-script discipline (ops apply strictly in list order):
//
// - `add(path, [(key, value), …])`    — insert children into the container
//   at `path`. Object keys append in listed order; array indices address
//   the insertion point at apply time, so ascending tail inserts behave
//   like pushes.
// - `remove(path, [(key, value), …])` — delete children. Values are
//   recorded for symmetry and ignored on apply. Array entries are listed
//   in descending index order so earlier removals never shift later ones.
// - `change(path, old, new)`          — replace the value at `path`. An
//   empty path replaces the whole document.
//
// On the wire (inside `info_patch`) a script is JSON:
//
//   [["add", [path…], [[key, value], …]],
//    ["remove", [path…], [[key, value], …]],
//    ["change", [path…], [old, new]], …]
//
// where a path element is an object key (string) or array index (integer).
//
// # Modules
//
// - `diff`  — script computation (self-verifying, total)
// - `patch` — script application

pub mod diff;
pub mod patch;

pub use diff::diff;
pub use patch::patch;

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Edit script model
// ---------------------------------------------------------------------------

/// One step of a path into a JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSeg {
    /// Object key.
    Key(String),
    /// Array index.
    Index(usize),
}

impl PathSeg {
    fn to_json(&self) -> Value {
        match self {
            Self::Key(k) => Value::String(k.clone()),
            Self::Index(i) => json!(i),
        }
    }

    fn from_json(v: &Value) -> Result<Self, PatchError> {
        match v {
            Value::String(k) => Ok(Self::Key(k.clone())),
            Value::Number(n) => n
                .as_u64()
                .and_then(|n| usize::try_from(n).ok())
                .map(Self::Index)
                .ok_or_else(|| PatchError::Malformed(format!("bad path index {n}"))),
            other => Err(PatchError::Malformed(format!(
                "path element is neither key nor index: {other}"
            ))),
        }
    }
}

/// One operation of a structural edit script.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffOp {
    Add {
        path: Vec<PathSeg>,
        entries: Vec<(PathSeg, Value)>,
    },
    Remove {
        path: Vec<PathSeg>,
        entries: Vec<(PathSeg, Value)>,
    },
    Change {
        path: Vec<PathSeg>,
        old: Value,
        new: Value,
    },
}

// ---------------------------------------------------------------------------
// Wire encoding
// ---------------------------------------------------------------------------

fn path_to_json(path: &[PathSeg]) -> Value {
    Value::Array(path.iter().map(PathSeg::to_json).collect())
}

fn entries_to_json(entries: &[(PathSeg, Value)]) -> Value {
    Value::Array(
        entries
            .iter()
            .map(|(k, v)| Value::Array(vec![k.to_json(), v.clone()]))
            .collect(),
    )
}

/// Encode an edit script as the JSON value stored in `info_patch`.
pub fn ops_to_json(ops: &[DiffOp]) -> Value {
    Value::Array(
        ops.iter()
            .map(|op| match op {
                DiffOp::Add { path, entries } => Value::Array(vec![
                    json!("add"),
                    path_to_json(path),
                    entries_to_json(entries),
                ]),
                DiffOp::Remove { path, entries } => Value::Array(vec![
                    json!("remove"),
                    path_to_json(path),
                    entries_to_json(entries),
                ]),
                DiffOp::Change { path, old, new } => Value::Array(vec![
                    json!("change"),
                    path_to_json(path),
                    Value::Array(vec![old.clone(), new.clone()]),
                ]),
            })
            .collect(),
    )
}

fn path_from_json(v: &Value) -> Result<Vec<PathSeg>, PatchError> {
    v.as_array()
        .ok_or_else(|| PatchError::Malformed("op path is not an array".into()))?
        .iter()
        .map(PathSeg::from_json)
        .collect()
}

fn entries_from_json(v: &Value) -> Result<Vec<(PathSeg, Value)>, PatchError> {
    v.as_array()
        .ok_or_else(|| PatchError::Malformed("op payload is not an array".into()))?
        .iter()
        .map(|pair| match pair.as_array().map(Vec::as_slice) {
            Some([key, value]) => Ok((PathSeg::from_json(key)?, value.clone())),
            _ => Err(PatchError::Malformed("op entry is not a [key, value] pair".into())),
        })
        .collect()
}

/// Decode an edit script from its `info_patch` JSON value.
pub fn ops_from_json(v: &Value) -> Result<Vec<DiffOp>, PatchError> {
    v.as_array()
        .ok_or_else(|| PatchError::Malformed("edit script is not an array".into()))?
        .iter()
        .map(|op| {
            let parts = op
                .as_array()
                .filter(|parts| parts.len() == 3)
                .ok_or_else(|| PatchError::Malformed("op is not a 3-element array".into()))?;
            let path = path_from_json(&parts[1])?;
            match parts[0].as_str() {
                Some("add") => Ok(DiffOp::Add {
                    path,
                    entries: entries_from_json(&parts[2])?,
                }),
                Some("remove") => Ok(DiffOp::Remove {
                    path,
                    entries: entries_from_json(&parts[2])?,
                }),
                Some("change") => match parts[2].as_array().map(Vec::as_slice) {
                    Some([old, new]) => Ok(DiffOp::Change {
                        path,
                        old: old.clone(),
                        new: new.clone(),
                    }),
                    _ => Err(PatchError::Malformed("change payload is not [old, new]".into())),
                },
                _ => Err(PatchError::Malformed(format!("unknown op tag {}", parts[0]))),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The edit script itself does not parse as a script.
    Malformed(String),
    /// A path or remove addresses an object key that does not exist.
    MissingKey(String),
    /// A path or edit addresses an array index that does not exist.
    BadIndex { index: usize, len: usize },
    /// A path step expects a container the document does not have there.
    TypeMismatch(String),
}

impl std::fmt::Display for PatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(msg) => write!(f, "malformed edit script: {msg}"),
            Self::MissingKey(key) => write!(f, "no such key `{key}`"),
            Self::BadIndex { index, len } => {
                write!(f, "index {index} out of bounds for array of {len}")
            }
            Self::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
        }
    }
}

impl std::error::Error for PatchError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
