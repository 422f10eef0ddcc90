pub mod types;

/// Return at most the first `max_chars` characters of `text`, never splitting
/// a UTF-8 code point.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
