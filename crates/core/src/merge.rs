//! Field-level merge policy for versioned documents.
//!
//! Documents are flat JSON objects. Two operations are provided:
//!
//! - [`apply_patch`]: the non-conflicting path: every patch field replaces
//!   the stored field.
//! - [`merge_local_edits`]: the conflict path: a locally edited field wins
//!   only when it is non-empty; otherwise the remote value is kept.
//!
//! The conflict heuristic can drop a deliberate local clear (setting a field
//! to `""`) in favour of the remote value. That is the documented behaviour.

use serde_json::{Map, Value};

/// A flat JSON document body.
pub type DocumentData = Map<String, Value>;

/// Whether a field value counts as a meaningful local edit.
///
/// `null`, empty strings and whitespace-only strings are empty; every other
/// value (numbers, booleans, non-empty strings, arrays, objects) is not.
pub fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Shallow-overlay `patch` onto `base`.
pub fn apply_patch(base: &DocumentData, patch: &DocumentData) -> DocumentData {
    let mut out = base.clone();
    for (key, value) in patch {
        out.insert(key.clone(), value.clone());
    }
    out
}

/// Merge local edits over a newer remote document.
///
/// Remote fields untouched by `local` are kept; local fields win only when
/// [`is_non_empty`].
pub fn merge_local_edits(remote: &DocumentData, local: &DocumentData) -> DocumentData {
    let mut out = remote.clone();
    for (key, value) in local {
        if is_non_empty(value) {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}
