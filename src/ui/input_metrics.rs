use unicode_width::UnicodeWidthChar;

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    text.chars().map(char_display_width).sum()
}

pub fn clamp_to_char_boundary_left(input: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(input.len());
    while cursor > 0 && !input.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

pub fn prev_char_boundary(input: &str, cursor: usize) -> usize {
    let cursor = clamp_to_char_boundary_left(input, cursor);
    if cursor == 0 {
        return 0;
    }
    let mut idx = cursor - 1;
    while idx > 0 && !input.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

pub fn next_char_boundary(input: &str, cursor: usize) -> usize {
    let cursor = clamp_to_char_boundary_left(input, cursor);
    match input[cursor..].chars().next() {
        Some(ch) => cursor + ch.len_utf8(),
        None => input.len(),
    }
}

/// Visible slice of a single-row input field. When the text is wider than
/// the field, the window scrolls horizontally so the cursor stays inside
/// it. Returns the visible text and the cursor's column within it.
pub fn visible_input_window(input: &str, cursor_byte: usize, width: usize) -> (String, usize) {
    let width = width.max(1);
    let cursor_byte = clamp_to_char_boundary_left(input, cursor_byte);
    let cursor_col: usize = input[..cursor_byte].chars().map(char_display_width).sum();
    let start_col = cursor_col.saturating_sub(width.saturating_sub(1));

    let mut visible = String::new();
    let mut col = 0usize;
    let mut used = 0usize;
    for ch in input.chars() {
        let ch_width = char_display_width(ch);
        if col >= start_col {
            if used + ch_width > width {
                break;
            }
            visible.push(ch);
            used += ch_width;
        }
        col += ch_width;
    }

    (visible, cursor_col - start_col)
}
