pub mod fs;
pub mod time;

mod ring_bytes;
pub use ring_bytes::RingBytes;

/// Expands `~` and `$VAR` references; unresolvable variables leave the input untouched.
pub fn expand_path(raw: &str) -> String {
    shellexpand::full(raw.trim())
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.trim().to_string())
}

/// Last `max_chars` characters of `s`, respecting char boundaries.
pub fn tail_chars(s: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return "";
    }
    match s.char_indices().rev().nth(max_chars - 1) {
        Some((idx, _)) => &s[idx..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_chars_keeps_suffix() {
        assert_eq!(tail_chars("abcdef", 3), "def");
        assert_eq!(tail_chars("ab", 10), "ab");
        assert_eq!(tail_chars("héllo", 4), "éllo");
        assert_eq!(tail_chars("abc", 0), "");
    }

    #[test]
    fn expand_path_leaves_plain_paths() {
        assert_eq!(expand_path(" data/events.json "), "data/events.json");
    }
}
