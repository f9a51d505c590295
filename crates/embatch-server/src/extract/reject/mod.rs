//! Extractors whose rejections render as structured error responses.

pub mod enhanced_json;
pub mod enhanced_path;

pub use self::enhanced_json::Json;
pub use self::enhanced_path::Path;

/// Collapses an axum rejection text into one bounded line.
pub(crate) fn summarize(text: &str, max_chars: usize) -> String {
    let mut summary = String::with_capacity(max_chars.min(text.len()));
    for (index, line) in text.lines().map(str::trim).filter(|l| !l.is_empty()).enumerate() {
        if index > 0 {
            summary.push(' ');
        }
        summary.push_str(line);
    }
    summary.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::summarize;

    #[test]
    fn test_summarize_joins_and_truncates() {
        assert_eq!(summarize("first\n\n  second  \n", 100), "first second");
        assert_eq!(summarize("abcdef", 3), "abc");
    }
}
