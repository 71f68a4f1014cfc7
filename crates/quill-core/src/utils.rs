//! Utility helpers — path resolution and string truncation.

use std::path::PathBuf;

/// Get the Quill data directory (e.g. `~/.quill/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".quill")
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(rest)
    } else if path == "~" {
        home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

/// Keep the first `max_chars` characters of `s`.
///
/// Returns `None` when `s` already fits. Unicode-safe.
pub fn truncate_chars(s: &str, max_chars: usize) -> Option<&str> {
    s.char_indices().nth(max_chars).map(|(idx, _)| &s[..idx])
}

/// Truncate a string to `max_len` characters, adding "..." if truncated.
/// Unicode-safe.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn home_dir() -> Option<PathBuf> {
    dirs_next::home_dir()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate_string("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
    }

    #[test]
    fn test_truncate_chars_fits() {
        assert_eq!(truncate_chars("hello", 5), None);
        assert_eq!(truncate_chars("", 0), None);
    }

    #[test]
    fn test_truncate_chars_cuts_prefix() {
        assert_eq!(truncate_chars("hello world", 5), Some("hello"));
    }

    #[test]
    fn test_truncate_chars_unicode() {
        assert_eq!(truncate_chars("こんにちは世界", 2), Some("こん"));
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/test/path");
        assert!(!expanded.starts_with("~"));
        assert!(expanded.to_str().unwrap().ends_with("test/path"));
    }

    #[test]
    fn test_expand_home_absolute() {
        assert_eq!(expand_home("/absolute/path"), PathBuf::from("/absolute/path"));
    }

    #[test]
    fn test_data_path_ends_with_quill() {
        assert!(get_data_path().ends_with(".quill"));
    }
}
