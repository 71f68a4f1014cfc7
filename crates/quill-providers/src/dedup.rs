//! Case-insensitive, order-preserving deduplication of entity lists.

use std::collections::HashSet;

use serde_json::Value;

use quill_core::types::EntitySet;

use crate::parse::RawEntities;

/// Trim, drop empties, and drop later case-insensitive duplicates.
///
/// The first occurrence keeps its original casing and position.
pub fn dedup_strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.as_ref().trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// [`dedup_strings`] over raw JSON values; non-strings are dropped.
pub fn dedup_values(values: &[Value]) -> Vec<String> {
    dedup_strings(values.iter().filter_map(Value::as_str))
}

/// Clean all four lists of a parsed response.
pub fn dedup_entities(raw: &RawEntities) -> EntitySet {
    EntitySet {
        projects: dedup_values(&raw.projects),
        participants: dedup_values(&raw.participants),
        tasks: dedup_values(&raw.tasks),
        themes: dedup_values(&raw.themes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_keeps_first_casing_and_order() {
        let out = dedup_strings(["Atlas", "bob", "ATLAS", "Bob", "carol", "atlas"]);
        assert_eq!(out, vec!["Atlas", "bob", "carol"]);
    }

    #[test]
    fn test_trims_and_drops_empty() {
        let out = dedup_strings(["  Atlas ", "", "   ", "atlas", "\tDesign\n"]);
        assert_eq!(out, vec!["Atlas", "Design"]);
    }

    #[test]
    fn test_drops_non_strings() {
        let values = vec![json!("A"), json!(1), json!(null), json!({"x": 1}), json!("a"), json!("B")];
        assert_eq!(dedup_values(&values), vec!["A", "B"]);
    }

    #[test]
    fn test_fields_are_independent() {
        let raw = RawEntities {
            projects: vec![json!("Atlas")],
            participants: vec![json!("atlas"), json!("Atlas")],
            tasks: vec![],
            themes: vec![json!(" focus "), json!("Focus")],
        };
        let set = dedup_entities(&raw);
        assert_eq!(set.projects, vec!["Atlas"]);
        assert_eq!(set.participants, vec!["atlas"]);
        assert!(set.tasks.is_empty());
        assert_eq!(set.themes, vec!["focus"]);
    }

    #[test]
    fn test_unicode_case_folding() {
        assert_eq!(dedup_strings(["Ärger", "ärger", "ÄRGER"]), vec!["Ärger"]);
    }

    proptest! {
        #[test]
        fn prop_no_case_insensitive_duplicates(items in proptest::collection::vec("[a-cA-C ]{0,4}", 0..20)) {
            let out = dedup_strings(&items);
            let mut keys = HashSet::new();
            for s in &out {
                prop_assert!(keys.insert(s.to_lowercase()));
                prop_assert!(!s.is_empty());
                prop_assert_eq!(s.trim(), s.as_str());
            }
        }

        #[test]
        fn prop_idempotent(items in proptest::collection::vec("\\PC{0,6}", 0..20)) {
            let once = dedup_strings(&items);
            let twice = dedup_strings(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_first_occurrence_casing(items in proptest::collection::vec("[a-cA-C]{1,3}", 0..20)) {
            let out = dedup_strings(&items);
            for s in &out {
                let first = items
                    .iter()
                    .find(|i| i.to_lowercase() == s.to_lowercase())
                    .unwrap();
                prop_assert_eq!(first, s);
            }
        }
    }
}
