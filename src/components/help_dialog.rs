//! Help dialog component
//!
//! Displays all keyboard shortcuts available in the application.

use crate::action::Action;
use crate::component::Component;
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

/// Help dialog showing all keyboard shortcuts
#[derive(Default)]
pub struct HelpDialog {
    scroll: ScrollView,
}

impl Component for HelpDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.scroll.handle_key(key) {
            return Ok(None);
        }
        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => Some(Action::CloseModal),
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        frame.render_widget(Clear, area);

        let margin = 4;
        let dialog_area = Rect::new(
            area.x + margin,
            area.y + margin / 2,
            area.width.saturating_sub(margin * 2),
            area.height.saturating_sub(margin),
        );

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Keyboard Shortcuts ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .border_style(Style::default().fg(Color::Cyan));
        self.scroll
            .render(frame, dialog_area, block, build_help_content());

        Ok(())
    }
}

/// Build the help content with all keyboard shortcuts
fn build_help_content() -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let add_section = |lines: &mut Vec<Line<'static>>, title: &str| {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("  {} ", title),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("  {}", "─".repeat(title.len() + 2)),
            Style::default().fg(Color::DarkGray),
        )));
    };

    let add_shortcut = |lines: &mut Vec<Line<'static>>, key: &str, description: &str| {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:16}", key),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(description.to_string(), Style::default().fg(Color::White)),
        ]));
    };

    add_section(&mut lines, "Form");
    add_shortcut(&mut lines, "Tab", "Next page");
    add_shortcut(&mut lines, "Shift+Tab", "Previous page");
    add_shortcut(&mut lines, "j / ↓", "Next field");
    add_shortcut(&mut lines, "k / ↑", "Previous field");
    add_shortcut(&mut lines, "Enter", "Edit field / commit edit");
    add_shortcut(&mut lines, "Esc", "Cancel edit");
    add_shortcut(&mut lines, "Space", "Toggle checkbox / next option");
    add_shortcut(&mut lines, "← / →", "Step select or number; move tag cursor");
    add_shortcut(&mut lines, "x / Del", "Remove selected tag");

    add_section(&mut lines, "Table");
    add_shortcut(&mut lines, "t", "Focus the page table");
    add_shortcut(&mut lines, "hjkl / arrows", "Move cell cursor");
    add_shortcut(&mut lines, "Enter", "Edit cell (✕ column deletes the row)");
    add_shortcut(&mut lines, "a", "Add row");
    add_shortcut(&mut lines, "x / Del", "Delete row under cursor");
    add_shortcut(&mut lines, "C", "Clear table");
    add_shortcut(&mut lines, "Esc", "Leave table");

    add_section(&mut lines, "Files");
    add_shortcut(&mut lines, "s", "Save output as JSON");
    add_shortcut(&mut lines, "o", "Load output from JSON");
    add_shortcut(&mut lines, "v", "View output JSON");

    add_section(&mut lines, "Database");
    add_shortcut(&mut lines, "c", "Connection settings");
    add_shortcut(&mut lines, "e", "Edit script of the focused field");
    add_shortcut(&mut lines, "r", "Run script of the focused field");
    add_shortcut(&mut lines, "Esc", "Cancel running query");
    add_shortcut(&mut lines, "E", "Show last connection error");

    add_section(&mut lines, "Script editor / Connection");
    add_shortcut(&mut lines, "Ctrl+s", "Save script / save connection");
    add_shortcut(&mut lines, "Ctrl+r", "Run the script being edited, saved or not");
    add_shortcut(&mut lines, "Ctrl+t", "Test connection");
    add_shortcut(&mut lines, "Enter", "Connect with these settings");
    add_shortcut(&mut lines, "Esc", "Close (unsaved edits are dropped)");

    add_section(&mut lines, "General");
    add_shortcut(&mut lines, "?", "Show this help");
    add_shortcut(&mut lines, "q", "Quit");
    add_shortcut(&mut lines, "Ctrl+c", "Quit without asking");

    // Footer
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  Press q, Esc, or ? to close",
        Style::default().fg(Color::DarkGray),
    )));

    lines
}
