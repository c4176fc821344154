//! Read-only view of the current output as pretty JSON

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use crate::components::scroll_view::ScrollView;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear},
    Frame,
};
use regex::Regex;
use std::sync::LazyLock;

/// Leading indent, optional `"key":`, then the value part
static JSON_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*)(?:("(?:[^"\\]|\\.)*")(\s*:\s*))?(.*)$"#).unwrap()
});

pub struct JsonViewDialog {
    text: String,
    scroll: ScrollView,
}

impl JsonViewDialog {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            scroll: ScrollView::default(),
        }
    }
}

fn value_style(value: &str) -> Style {
    let trimmed = value.trim_end_matches(',');
    if trimmed.starts_with('"') {
        Style::default().fg(Color::Green)
    } else if trimmed == "true" || trimmed == "false" || trimmed == "null" {
        Style::default().fg(Color::Magenta)
    } else if trimmed.parse::<f64>().is_ok() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

/// Color one line of pretty-printed JSON
pub fn highlight_json_line(line: &str) -> Line<'static> {
    let Some(caps) = JSON_LINE.captures(line) else {
        return Line::from(line.to_string());
    };
    let mut spans = vec![Span::raw(caps[1].to_string())];
    if let (Some(key), Some(colon)) = (caps.get(2), caps.get(3)) {
        spans.push(Span::styled(
            key.as_str().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(colon.as_str().to_string()));
    }
    let value = &caps[4];
    spans.push(Span::styled(value.to_string(), value_style(value)));
    Line::from(spans)
}

impl Component for JsonViewDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.scroll.handle_key(key) {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('v') | KeyCode::Enter => {
                Some(Action::CloseModal)
            }
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let popup_area = centered_popup(
            area,
            area.width.saturating_mul(4) / 5,
            area.height.saturating_mul(4) / 5,
        );
        frame.render_widget(Clear, popup_area);

        let lines: Vec<Line> = self.text.lines().map(highlight_json_line).collect();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Output JSON ")
            .title_bottom(Line::from(" j/k scroll · Esc close ").right_aligned())
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .border_style(Style::default().fg(Color::Cyan));
        self.scroll.render(frame, popup_area, block, lines);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(line: &Line) -> Vec<String> {
        line.spans.iter().map(|s| s.content.to_string()).collect()
    }

    #[test]
    fn test_key_value_line_splits_into_parts() {
        let line = highlight_json_line(r#"  "object_name": "orders","#);
        assert_eq!(
            contents(&line),
            vec!["  ", "\"object_name\"", ": ", "\"orders\","]
        );
        assert_eq!(line.spans[3].style.fg, Some(Color::Green));
    }

    #[test]
    fn test_bare_values_and_brackets() {
        let number = highlight_json_line("    42");
        assert_eq!(number.spans.last().unwrap().style.fg, Some(Color::Yellow));
        let bracket = highlight_json_line("  ],");
        assert_eq!(bracket.spans.last().unwrap().style.fg, Some(Color::DarkGray));
        let escaped = highlight_json_line(r#"  "a\"b": true"#);
        assert_eq!(escaped.spans[1].content, r#""a\"b""#);
        assert_eq!(escaped.spans[3].style.fg, Some(Color::Magenta));
    }
}
