/// Truncate `s` to at most `max_chars` characters, appending `...` when something was cut.
pub fn excerpt(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_keeps_short_strings() {
        assert_eq!(excerpt("abc", 5), "abc");
        assert_eq!(excerpt("abcde", 5), "abcde");
    }

    #[test]
    fn excerpt_cuts_on_char_boundary() {
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("🔍🎨✨x", 2), "🔍🎨...");
    }
}
