//! Entity parser — pulls the entity JSON object out of raw model text.
//!
//! Models wrap JSON in markdown fences, add chatter around it, or return
//! nothing usable. Extraction order:
//! 1. a fenced code block (any or no language tag) holding a `{...}` object
//! 2. the first `{` through the last `}` in the text
//! 3. the raw text as-is
//!
//! A decode failure is not fatal: callers get empty lists plus a
//! [`ParseError`] they can keep as a diagnostic.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static FENCED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(\{.*?\})\s*```").expect("fenced JSON pattern")
});

static BRACED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("braced JSON pattern"));

/// Field names the model is asked to return.
pub const ENTITY_FIELDS: [&str; 4] = ["projects", "participants", "tasks", "themes"];

/// The four entity fields as decoded, before cleanup.
///
/// Entries are raw JSON values; the deduplicator drops non-strings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawEntities {
    pub projects: Vec<Value>,
    pub participants: Vec<Value>,
    pub tasks: Vec<Value>,
    pub themes: Vec<Value>,
}

/// The model text did not contain a decodable JSON object.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid JSON in model response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model response JSON is not an object")]
    NotAnObject,
}

/// Locate the JSON candidate inside raw model text.
pub fn extract_json(raw: &str) -> &str {
    if let Some(caps) = FENCED_JSON.captures(raw) {
        if let Some(m) = caps.get(1) {
            return m.as_str();
        }
    }
    if let Some(m) = BRACED_JSON.find(raw) {
        return m.as_str();
    }
    raw
}

/// Decode the entity object. Missing or non-array fields become empty.
pub fn parse_response(raw: &str) -> Result<RawEntities, ParseError> {
    let value: Value = serde_json::from_str(extract_json(raw))?;
    let obj = value.as_object().ok_or(ParseError::NotAnObject)?;

    let field = |name: &str| -> Vec<Value> {
        obj.get(name)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    Ok(RawEntities {
        projects: field("projects"),
        participants: field("participants"),
        tasks: field("tasks"),
        themes: field("themes"),
    })
}

/// [`parse_response`], degrading any failure to empty lists.
pub fn parse_entities(raw: &str) -> RawEntities {
    parse_response(raw).unwrap_or_default()
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_json_with_tag() {
        let raw = "```json\n{\"projects\":[\"A\"]}\n```";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.projects, vec![json!("A")]);
        assert!(parsed.participants.is_empty());
        assert!(parsed.tasks.is_empty());
        assert!(parsed.themes.is_empty());
    }

    #[test]
    fn test_fenced_json_without_tag() {
        let raw = "Here you go:\n```\n{\"themes\": [\"rest\"]}\n```\nHope it helps.";
        assert_eq!(parse_entities(raw).themes, vec![json!("rest")]);
    }

    #[test]
    fn test_fenced_json_with_nested_braces() {
        let raw = "```json\n{\"projects\": [\"A\"], \"meta\": {\"k\": 1}}\n```";
        assert_eq!(parse_entities(raw).projects, vec![json!("A")]);
    }

    #[test]
    fn test_bare_json_with_chatter() {
        let raw = "Sure! {\n  \"tasks\": [\"write report\"],\n  \"participants\": [\"Bo\"]\n} Let me know.";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.tasks, vec![json!("write report")]);
        assert_eq!(parsed.participants, vec![json!("Bo")]);
    }

    #[test]
    fn test_plain_json() {
        let raw = r#"{"projects":["X"],"participants":[],"tasks":["t"],"themes":["z"]}"#;
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.projects.len(), 1);
        assert_eq!(parsed.themes, vec![json!("z")]);
    }

    #[test]
    fn test_empty_string_degrades() {
        assert!(parse_response("").is_err());
        assert_eq!(parse_entities(""), RawEntities::default());
    }

    #[test]
    fn test_prose_degrades() {
        let err = parse_response("I could not find any entities.").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
        assert_eq!(parse_entities("no json here"), RawEntities::default());
    }

    #[test]
    fn test_non_array_fields_become_empty() {
        let raw = r#"{"projects": "Atlas", "participants": null, "tasks": 3, "themes": ["ok"]}"#;
        let parsed = parse_response(raw).unwrap();
        assert!(parsed.projects.is_empty());
        assert!(parsed.participants.is_empty());
        assert!(parsed.tasks.is_empty());
        assert_eq!(parsed.themes, vec![json!("ok")]);
    }

    #[test]
    fn test_non_object_json() {
        let err = parse_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, ParseError::NotAnObject));
    }

    #[test]
    fn test_non_string_entries_are_kept_raw() {
        let parsed = parse_response(r#"{"projects": ["A", 1, null]}"#).unwrap();
        assert_eq!(parsed.projects.len(), 3);
    }

    #[test]
    fn test_extract_json_prefers_fence() {
        let raw = "{\"projects\": [\"outside\"]}\n```json\n{\"projects\": [\"inside\"]}\n```";
        assert_eq!(extract_json(raw), "{\"projects\": [\"inside\"]}");
    }
}
