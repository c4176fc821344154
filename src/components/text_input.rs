//! Single-line input rendering with a block cursor

use ratatui::{
    style::{Modifier, Style},
    text::Span,
};

/// Spans for `text` with the char at `cursor` reversed
pub fn cursor_spans(text: &str, cursor: usize, style: Style) -> Vec<Span<'static>> {
    let before: String = text.chars().take(cursor).collect();
    let at: String = text.chars().skip(cursor).take(1).collect();
    let after: String = text.chars().skip(cursor + 1).collect();
    vec![
        Span::styled(before, style),
        Span::styled(
            if at.is_empty() { " ".to_string() } else { at },
            style.add_modifier(Modifier::REVERSED),
        ),
        Span::styled(after, style),
    ]
}
