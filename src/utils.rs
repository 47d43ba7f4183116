/// Shared utility functions

/// First `max_chars` characters of `s` (character count, not bytes)
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Single-line preview: newlines flattened, cut to `max_chars`
pub fn one_line(s: &str, max_chars: usize) -> String {
    truncate_chars(s, max_chars).replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_one_line() {
        assert_eq!(one_line("a\nb\nc", 3), "a b");
    }
}
