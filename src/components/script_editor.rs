//! SQL script editor
//!
//! Full-screen editor for the script attached to one text field. The lower
//! pane shows the script rendered against the field's current value and is
//! refreshed on every edit. Ctrl+R runs the text as it stands, saved or not.

use crate::action::Action;
use crate::component::Component;
use crate::components::sql_highlight::highlight_sql;
use crate::services::template::TemplateEngine;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

const TAB: &str = "    ";

pub struct ScriptEditor {
    key: String,
    lines: Vec<String>,
    row: usize,
    /// Char index within the current line
    col: usize,
    scroll: usize,
    value: Value,
    engine: TemplateEngine,
    preview: Result<String, String>,
    modified: bool,
}

impl ScriptEditor {
    pub fn new(key: impl Into<String>, script: &str, value: Value) -> Self {
        let mut lines: Vec<String> = script.split('\n').map(str::to_string).collect();
        if lines.is_empty() {
            lines.push(String::new());
        }
        let mut editor = Self {
            key: key.into(),
            lines,
            row: 0,
            col: 0,
            scroll: 0,
            value,
            engine: TemplateEngine::new(),
            preview: Ok(String::new()),
            modified: false,
        };
        editor.refresh_preview();
        editor
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn preview(&self) -> &Result<String, String> {
        &self.preview
    }

    fn refresh_preview(&mut self) {
        self.preview = self
            .engine
            .render(&self.text(), &self.value)
            .map_err(|e| e.message().to_string());
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines.get(row).map_or(0, |l| l.chars().count())
    }

    fn byte_index(line: &str, col: usize) -> usize {
        line.char_indices()
            .nth(col)
            .map(|(i, _)| i)
            .unwrap_or(line.len())
    }

    fn edited(&mut self) {
        self.modified = true;
        self.refresh_preview();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    pub fn insert_str(&mut self, text: &str) {
        let line = &mut self.lines[self.row];
        let at = Self::byte_index(line, self.col);
        line.insert_str(at, text);
        self.col += text.chars().count();
        self.edited();
    }

    pub fn newline(&mut self) {
        let line = &mut self.lines[self.row];
        let at = Self::byte_index(line, self.col);
        let rest = line.split_off(at);
        self.lines.insert(self.row + 1, rest);
        self.row += 1;
        self.col = 0;
        self.edited();
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            let line = &mut self.lines[self.row];
            let at = Self::byte_index(line, self.col - 1);
            line.remove(at);
            self.col -= 1;
        } else if self.row > 0 {
            let current = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&current);
        } else {
            return;
        }
        self.edited();
    }

    pub fn delete(&mut self) {
        if self.col < self.line_len(self.row) {
            let line = &mut self.lines[self.row];
            let at = Self::byte_index(line, self.col);
            line.remove(at);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        } else {
            return;
        }
        self.edited();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cursor
    // ─────────────────────────────────────────────────────────────────────────

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    fn move_right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    fn move_vertical(&mut self, delta: isize) {
        let last = self.lines.len().saturating_sub(1);
        self.row = self.row.saturating_add_signed(delta).min(last);
        self.col = self.col.min(self.line_len(self.row));
    }

    fn keep_cursor_visible(&mut self, height: usize) {
        if height == 0 {
            return;
        }
        if self.row < self.scroll {
            self.scroll = self.row;
        } else if self.row >= self.scroll + height {
            self.scroll = self.row + 1 - height;
        }
    }
}

impl Component for ScriptEditor {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => return Ok(Some(Action::SaveScript(self.key.clone()))),
            KeyCode::Char('r') if ctrl => return Ok(Some(Action::RunEditorScript)),
            KeyCode::Esc => return Ok(Some(Action::CloseModal)),
            KeyCode::Char(c) if !ctrl => self.insert_str(&c.to_string()),
            KeyCode::Tab => self.insert_str(TAB),
            KeyCode::Enter => self.newline(),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.move_left(),
            KeyCode::Right => self.move_right(),
            KeyCode::Up => self.move_vertical(-1),
            KeyCode::Down => self.move_vertical(1),
            KeyCode::PageUp => self.move_vertical(-10),
            KeyCode::PageDown => self.move_vertical(10),
            KeyCode::Home => self.col = 0,
            KeyCode::End => self.col = self.line_len(self.row),
            _ => {}
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(60),
                Constraint::Min(5),
                Constraint::Length(1),
            ])
            .split(area);

        // Editor pane
        let marker = if self.modified { " [modified]" } else { "" };
        let editor_block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" Script: {}{} ", self.key, marker))
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .border_style(Style::default().fg(Color::Cyan));
        let inner = editor_block.inner(chunks[0]);
        let gutter = (self.lines.len().to_string().len() + 1) as u16;

        self.keep_cursor_visible(inner.height as usize);
        let highlighted = highlight_sql(&self.text());
        let lines: Vec<Line> = highlighted
            .into_iter()
            .enumerate()
            .skip(self.scroll)
            .take(inner.height as usize)
            .map(|(i, line)| {
                let mut spans = vec![Span::styled(
                    format!("{:>width$} ", i + 1, width = gutter as usize - 1),
                    Style::default().fg(Color::DarkGray),
                )];
                spans.extend(line.spans);
                Line::from(spans)
            })
            .collect();
        frame.render_widget(Paragraph::new(lines).block(editor_block), chunks[0]);

        let (row, col) = self.cursor();
        let prefix: String = self.lines[row].chars().take(col).collect();
        let x = inner.x + gutter + prefix.width() as u16;
        let y = inner.y + (row - self.scroll) as u16;
        if x < inner.right() && y < inner.bottom() {
            frame.set_cursor_position(Position::new(x, y));
        }

        // Preview pane
        let (preview_lines, border) = match self.preview() {
            Ok(sql) => (highlight_sql(sql), Color::Green),
            Err(message) => (
                vec![Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(Color::Red),
                ))],
                Color::Red,
            ),
        };
        let preview = Paragraph::new(preview_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Rendered (value = {}) ", self.value))
                    .border_style(Style::default().fg(border)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(preview, chunks[1]);

        let help = Line::from(vec![
            Span::styled(" ^S ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("Save  "),
            Span::styled(" ^R ", Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD)),
            Span::raw("Run  "),
            Span::styled(" Esc ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw("Close (unsaved edits are dropped)"),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[2]);
        Ok(())
    }
}
