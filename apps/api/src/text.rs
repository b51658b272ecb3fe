//! Small text helpers shared by scraping and prompt building.

/// Cuts `text` to at most `max_chars` characters, preferring a word boundary
/// in the second half, and appends `...` when anything was removed.
pub fn truncate_at_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let cut = text
        .char_indices()
        .nth(keep)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let mut truncated = &text[..cut];

    if let Some(space) = truncated.rfind(char::is_whitespace) {
        if truncated[..space].chars().count() > max_chars / 2 {
            truncated = &truncated[..space];
        }
    }

    format!("{}...", truncated.trim_end())
}

/// Collapses every whitespace run to a single space.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
