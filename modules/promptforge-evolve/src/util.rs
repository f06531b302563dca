/// Truncate to at most `max_len` bytes without splitting a UTF-8 character.
pub fn truncate_prompt(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_passes_through() {
        assert_eq!(truncate_prompt("hello", 100), "hello");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // "ağaç" — 'ğ' is 2 bytes; a cut at byte 2 lands mid-character.
        let cut = truncate_prompt("ağaç", 2);
        assert_eq!(cut, "a");
    }

    #[test]
    fn exact_length_is_untouched() {
        assert_eq!(truncate_prompt("12345", 5), "12345");
    }
}
