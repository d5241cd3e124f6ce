use unicode_segmentation::UnicodeSegmentation;

/// Length of `s` in user-perceived characters.
pub(crate) fn grapheme_len(s: &str) -> usize {
    s.graphemes(true).count()
}

/// Trims `value` and maps blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
