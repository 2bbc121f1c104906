/// Truncate a string to at most `max_chars` characters.
///
/// Counts Unicode scalar values, not bytes, so Korean and emoji text is cut
/// at the same logical length as ASCII.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Strip markdown code fences a model sometimes wraps its answer in.
pub fn strip_code_blocks(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```text")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let text = "안녕하세요 world";
        assert_eq!(truncate_chars(text, 5), "안녕하세요");
    }

    #[test]
    fn truncate_within_bounds_is_identity() {
        assert_eq!(truncate_chars("Hello", 100), "Hello");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn strip_code_blocks_removes_fences() {
        assert_eq!(strip_code_blocks("```text\nSite: x\n```"), "Site: x");
        assert_eq!(strip_code_blocks("```\nSite: x\n```"), "Site: x");
        assert_eq!(strip_code_blocks("Site: x"), "Site: x");
    }
}
