//! Prompt construction for entity extraction.

use std::borrow::Cow;

use quill_core::utils::truncate_chars;

/// Longest journal content (in characters) sent to a model.
pub const MAX_CONTENT_CHARS: usize = 8_000;

/// Appended after truncated content.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated...]";

const TEMPLATE_HEAD: &str = "\
Analyze the following journal entry and extract structured information.

Return a JSON object with exactly these fields, each an array of strings:
- \"projects\": projects, products or initiatives the entry works on or mentions
- \"participants\": people, teams or organizations involved
- \"tasks\": concrete tasks, action items or activities
- \"themes\": recurring topics, concerns or ideas

Use an empty array when a category has nothing. Return only the JSON object, \
with no commentary.

Journal entry:
---
";

const TEMPLATE_TAIL: &str = "\n---\n";

/// Cut `content` to [`MAX_CONTENT_CHARS`], keeping the prefix and appending
/// [`TRUNCATION_MARKER`].
pub fn prepare_content(content: &str) -> Cow<'_, str> {
    match truncate_chars(content, MAX_CONTENT_CHARS) {
        Some(prefix) => Cow::Owned(format!("{prefix}{TRUNCATION_MARKER}")),
        None => Cow::Borrowed(content),
    }
}

/// Build the extraction prompt for one journal entry.
pub fn build_prompt(content: &str) -> String {
    let body = prepare_content(content);
    let mut prompt = String::with_capacity(TEMPLATE_HEAD.len() + body.len() + TEMPLATE_TAIL.len());
    prompt.push_str(TEMPLATE_HEAD);
    prompt.push_str(&body);
    prompt.push_str(TEMPLATE_TAIL);
    prompt
}
