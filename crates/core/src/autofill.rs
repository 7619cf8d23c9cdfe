//! Student lookup used to prefill the record form.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// Reference data for a known student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: EntityId,
    pub name: String,
    pub group: String,
    pub mentor: String,
    pub status: String,
}

/// Fields suggested for a record once a student is recognised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillHint {
    pub group: String,
    pub mentor: String,
    pub status: String,
}

/// Queries shorter than this return nothing.
pub const MIN_QUERY_LEN: usize = 2;

/// Find the best student match for `name`.
///
/// An exact case-insensitive match wins; otherwise the first student whose
/// name contains the query, or is contained by it.
pub fn find_autofill(students: &[Student], name: &str) -> Option<AutofillHint> {
    let query = name.trim().to_lowercase();
    if query.chars().count() < MIN_QUERY_LEN {
        return None;
    }

    let exact = students.iter().find(|s| s.name.to_lowercase() == query);
    let student = exact.or_else(|| {
        students.iter().find(|s| {
            let candidate = s.name.to_lowercase();
            candidate.contains(&query) || query.contains(&candidate)
        })
    })?;

    Some(AutofillHint {
        group: student.group.clone(),
        mentor: student.mentor.clone(),
        status: student.status.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn students() -> Vec<Student> {
        vec![
            Student {
                id: "s1".into(),
                name: "Sardor Alijonov".into(),
                group: "GW113".into(),
                mentor: "Jasur Rahimov".into(),
                status: "group".into(),
            },
            Student {
                id: "s2".into(),
                name: "Sardor".into(),
                group: "GW200".into(),
                mentor: "Other".into(),
                status: "coworking".into(),
            },
        ]
    }

    #[test]
    fn exact_match_beats_partial() {
        let hint = find_autofill(&students(), " sardor ").unwrap();
        assert_eq!(hint.group, "GW200");
    }

    #[test]
    fn partial_match_in_either_direction() {
        let hint = find_autofill(&students(), "alijonov").unwrap();
        assert_eq!(hint.mentor, "Jasur Rahimov");
        let hint = find_autofill(&students(), "Sardor Alijonov Jr").unwrap();
        assert_eq!(hint.group, "GW113");
    }

    #[test]
    fn short_or_unknown_queries_yield_nothing() {
        assert!(find_autofill(&students(), "s").is_none());
        assert!(find_autofill(&students(), "Zulfiya").is_none());
    }
}
