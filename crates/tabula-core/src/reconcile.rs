//! Cross-model reconciliation of extracted JSON outputs.
//!
//! Arrays are compared as multisets: element order is ignored, multiplicity is
//! not. Objects are compared key by key. Scalars compare exactly, so `1` and
//! `1.0` differ.

use crate::output::read_json_file;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Result of comparing a set of output files.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonOutcome {
    /// Every candidate matches the reference
    Success,
    /// The first failing candidate (or an unreadable reference)
    Failed(ComparisonFailure),
    /// Fewer than two files were given
    NoComparison,
}

impl ComparisonOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed(_) => "FAILED",
            Self::NoComparison => "NO_COMPARISON",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for ComparisonOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a comparison failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonFailure {
    ReferenceUnreadable { path: PathBuf, message: String },
    CandidateUnreadable { path: PathBuf, message: String },
    Mismatch {
        reference: PathBuf,
        candidate: PathBuf,
        diff: JsonDiff,
    },
}

impl fmt::Display for ComparisonFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferenceUnreadable { path, message } => {
                write!(f, "Could not load reference file {}: {message}", path.display())
            }
            Self::CandidateUnreadable { path, message } => {
                write!(f, "Could not load comparison file {}: {message}", path.display())
            }
            Self::Mismatch {
                reference,
                candidate,
                diff,
            } => {
                writeln!(
                    f,
                    "{} does not match the reference {}:",
                    candidate.display(),
                    reference.display()
                )?;
                write!(f, "{diff}")
            }
        }
    }
}

/// Compare every file against the first one.
///
/// Stops at the first candidate that fails to load or does not match.
pub async fn compare_files<P: AsRef<Path>>(paths: &[P]) -> ComparisonOutcome {
    let Some((reference_path, candidates)) = paths.split_first() else {
        tracing::warn!("Less than two files provided; no comparison performed");
        return ComparisonOutcome::NoComparison;
    };
    if candidates.is_empty() {
        tracing::warn!("Less than two files provided; no comparison performed");
        return ComparisonOutcome::NoComparison;
    }

    let reference_path = reference_path.as_ref();
    tracing::info!("Using {:?} as the reference", reference_path);
    let reference = match read_json_file(reference_path).await {
        Ok(value) => value,
        Err(message) => {
            tracing::error!("Failed to load reference {:?}: {message}", reference_path);
            return ComparisonOutcome::Failed(ComparisonFailure::ReferenceUnreadable {
                path: reference_path.to_path_buf(),
                message,
            });
        }
    };

    for candidate_path in candidates {
        let candidate_path = candidate_path.as_ref();
        tracing::info!("Comparing with {:?}", candidate_path);
        let candidate = match read_json_file(candidate_path).await {
            Ok(value) => value,
            Err(message) => {
                tracing::error!("Failed to load {:?}: {message}", candidate_path);
                return ComparisonOutcome::Failed(ComparisonFailure::CandidateUnreadable {
                    path: candidate_path.to_path_buf(),
                    message,
                });
            }
        };

        let diff = diff_unordered(&reference, &candidate);
        if !diff.is_empty() {
            tracing::warn!("Mismatch detected in {:?}:\n{diff}", candidate_path);
            return ComparisonOutcome::Failed(ComparisonFailure::Mismatch {
                reference: reference_path.to_path_buf(),
                candidate: candidate_path.to_path_buf(),
                diff,
            });
        }
    }

    tracing::info!("All files match");
    ComparisonOutcome::Success
}

/// A single difference, located by JSON pointer.
///
/// Pointers address the reference document, except that the last array
/// index of an [`Change::Added`] entry is the item's index in the candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub pointer: String,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    ValueChanged { old: Value, new: Value },
    TypeChanged { old: Value, new: Value },
    Added(Value),
    Removed(Value),
}

/// Structural differences between two JSON documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonDiff {
    entries: Vec<DiffEntry>,
}

impl JsonDiff {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[DiffEntry] {
        &self.entries
    }

    fn push(&mut self, pointer: &str, change: Change) {
        self.entries.push(DiffEntry {
            pointer: pointer.to_string(),
            change,
        });
    }
}

impl fmt::Display for JsonDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let at = if entry.pointer.is_empty() {
                "root"
            } else {
                entry.pointer.as_str()
            };
            match &entry.change {
                Change::ValueChanged { old, new } => {
                    writeln!(f, "Value of {at} changed from {old} to {new}.")?
                }
                Change::TypeChanged { old, new } => writeln!(
                    f,
                    "Type of {at} changed from {} to {} and value changed from {old} to {new}.",
                    type_name(old),
                    type_name(new)
                )?,
                Change::Added(value) => writeln!(f, "Item {at} added: {value}.")?,
                Change::Removed(value) => writeln!(f, "Item {at} removed: {value}.")?,
            }
        }
        Ok(())
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Diff `candidate` against `reference`, ignoring array order.
pub fn diff_unordered(reference: &Value, candidate: &Value) -> JsonDiff {
    let mut diff = JsonDiff::default();
    diff_at(reference, candidate, "", &mut diff);
    diff
}

/// Equality with arrays treated as multisets.
pub fn unordered_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| unordered_eq(v, w)))
        }
        (Value::Array(x), Value::Array(y)) => {
            if x.len() != y.len() {
                return false;
            }
            let (left, right) = unmatched(x, y);
            left.is_empty() && right.is_empty()
        }
        _ => a == b,
    }
}

/// Indices of elements on each side without an equal partner on the other.
///
/// Greedy matching is exact here because `unordered_eq` is an equivalence.
fn unmatched(reference: &[Value], candidate: &[Value]) -> (Vec<usize>, Vec<usize>) {
    let mut used = vec![false; candidate.len()];
    let mut left = Vec::new();

    for (i, item) in reference.iter().enumerate() {
        let partner = candidate
            .iter()
            .enumerate()
            .position(|(j, other)| !used[j] && unordered_eq(item, other));
        match partner {
            Some(j) => used[j] = true,
            None => left.push(i),
        }
    }

    let right = used
        .iter()
        .enumerate()
        .filter(|(_, taken)| !**taken)
        .map(|(j, _)| j)
        .collect();
    (left, right)
}

fn diff_at(reference: &Value, candidate: &Value, pointer: &str, diff: &mut JsonDiff) {
    match (reference, candidate) {
        (Value::Object(old), Value::Object(new)) => {
            for (key, old_value) in old {
                let child = child_pointer(pointer, key);
                match new.get(key) {
                    Some(new_value) => diff_at(old_value, new_value, &child, diff),
                    None => diff.push(&child, Change::Removed(old_value.clone())),
                }
            }
            for (key, new_value) in new {
                if !old.contains_key(key) {
                    diff.push(&child_pointer(pointer, key), Change::Added(new_value.clone()));
                }
            }
        }
        (Value::Array(old), Value::Array(new)) => {
            let (left, right) = unmatched(old, new);
            // Unmatched elements are paired in order so a changed cell shows
            // up at its own pointer instead of as a whole-row swap.
            for (&i, &j) in left.iter().zip(right.iter()) {
                diff_at(&old[i], &new[j], &child_pointer(pointer, &i.to_string()), diff);
            }
            for &i in left.iter().skip(right.len()) {
                diff.push(
                    &child_pointer(pointer, &i.to_string()),
                    Change::Removed(old[i].clone()),
                );
            }
            for &j in right.iter().skip(left.len()) {
                diff.push(
                    &child_pointer(pointer, &j.to_string()),
                    Change::Added(new[j].clone()),
                );
            }
        }
        _ if reference == candidate => {}
        _ if type_name(reference) != type_name(candidate) => diff.push(
            pointer,
            Change::TypeChanged {
                old: reference.clone(),
                new: candidate.clone(),
            },
        ),
        _ => diff.push(
            pointer,
            Change::ValueChanged {
                old: reference.clone(),
                new: candidate.clone(),
            },
        ),
    }
}

fn child_pointer(parent: &str, token: &str) -> String {
    format!("{parent}/{}", token.replace('~', "~0").replace('/', "~1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, value.to_string()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_reordered_rows_match() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.json", &json!([{"a": 1}, {"b": 2}]));
        let b = write(dir.path(), "b.json", &json!([{"b": 2}, {"a": 1}]));
        assert_eq!(compare_files(&[a, b]).await, ComparisonOutcome::Success);
    }

    #[tokio::test]
    async fn test_changed_value_fails_with_pointer() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.json", &json!([{"a": 1}, {"b": 2}]));
        let b = write(dir.path(), "b.json", &json!([{"a": 1}, {"b": 3}]));

        let outcome = compare_files(&[a, b.clone()]).await;
        assert_eq!(outcome.label(), "FAILED");
        let ComparisonOutcome::Failed(ComparisonFailure::Mismatch { candidate, diff, .. }) =
            outcome
        else {
            panic!("expected a mismatch");
        };
        assert_eq!(candidate, b);
        assert_eq!(
            diff.entries(),
            &[DiffEntry {
                pointer: "/1/b".to_string(),
                change: Change::ValueChanged {
                    old: json!(2),
                    new: json!(3)
                },
            }]
        );
        assert_eq!(diff.to_string(), "Value of /1/b changed from 2 to 3.\n");
    }

    #[tokio::test]
    async fn test_single_file_is_no_comparison() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.json", &json!([]));
        assert_eq!(compare_files(&[a]).await, ComparisonOutcome::NoComparison);
        assert_eq!(
            compare_files::<PathBuf>(&[]).await.label(),
            "NO_COMPARISON"
        );
    }

    #[tokio::test]
    async fn test_missing_reference_fails() {
        let dir = tempdir().unwrap();
        let b = write(dir.path(), "b.json", &json!([]));
        let outcome = compare_files(&[dir.path().join("missing.json"), b]).await;
        assert!(matches!(
            outcome,
            ComparisonOutcome::Failed(ComparisonFailure::ReferenceUnreadable { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_candidate_short_circuits() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a.json", &json!({"x": 1}));
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{not json").unwrap();
        let c = write(dir.path(), "c.json", &json!({"x": 2}));

        let outcome = compare_files(&[a, bad.clone(), c]).await;
        match outcome {
            ComparisonOutcome::Failed(ComparisonFailure::CandidateUnreadable { path, .. }) => {
                assert_eq!(path, bad)
            }
            other => panic!("expected unreadable candidate, got {other:?}"),
        }
    }

    #[test]
    fn test_multiplicity_matters() {
        let diff = diff_unordered(&json!([1, 1, 2]), &json!([1, 2, 2]));
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.entries()[0].pointer, "/1");
        assert!(!unordered_eq(&json!([1, 1]), &json!([1])));
        assert!(unordered_eq(&json!([[2, 1], [3]]), &json!([[3], [1, 2]])));
    }

    #[test]
    fn test_added_and_removed_keys() {
        let diff = diff_unordered(
            &json!({"rows": [{"Name": "Tiger", "Legs": 4}]}),
            &json!({"rows": [{"Name": "Tiger", "Tail": true}]}),
        );
        let changes: Vec<(&str, &Change)> = diff
            .entries()
            .iter()
            .map(|e| (e.pointer.as_str(), &e.change))
            .collect();
        assert_eq!(
            changes,
            vec![
                ("/rows/0/Legs", &Change::Removed(json!(4))),
                ("/rows/0/Tail", &Change::Added(json!(true))),
            ]
        );
    }

    #[test]
    fn test_extra_row_is_added_at_candidate_index() {
        let diff = diff_unordered(&json!([{"a": 1}]), &json!([{"a": 1}, {"b": 2}]));
        assert_eq!(diff.len(), 1);
        assert_eq!(diff.entries()[0].pointer, "/1");
        assert_eq!(diff.entries()[0].change, Change::Added(json!({"b": 2})));
    }

    #[test]
    fn test_type_change_and_pointer_escaping() {
        let diff = diff_unordered(&json!({"a/b": 1}), &json!({"a/b": "1"}));
        assert_eq!(diff.entries()[0].pointer, "/a~1b");
        assert!(matches!(diff.entries()[0].change, Change::TypeChanged { .. }));
        assert!(diff.to_string().starts_with("Type of /a~1b changed from number to string"));

        let root = diff_unordered(&json!(1), &json!(2));
        assert_eq!(root.to_string(), "Value of root changed from 1 to 2.\n");
    }
}
