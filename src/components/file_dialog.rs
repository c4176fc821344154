//! Path prompt for saving or loading the output document

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use crate::components::text_input::cursor_spans;
use crate::model::field::TextControl;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Save,
    Load,
}

impl FileMode {
    fn title(&self) -> &'static str {
        match self {
            FileMode::Save => " Save output ",
            FileMode::Load => " Load output ",
        }
    }
}

pub struct FileDialog {
    mode: FileMode,
    path: TextControl,
}

impl FileDialog {
    /// `suggested` is either a bare file name (resolved under `save_config/`) or a path
    pub fn new(mode: FileMode, suggested: &str) -> Self {
        Self {
            mode,
            path: TextControl::new("path", suggested),
        }
    }

    pub fn path(&self) -> &str {
        self.path.text()
    }
}

impl Component for FileDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Esc => Some(Action::CloseModal),
            KeyCode::Enter => {
                let path = self.path().trim().to_string();
                if path.is_empty() {
                    None
                } else {
                    match self.mode {
                        FileMode::Save => Some(Action::SaveOutput(path)),
                        FileMode::Load => Some(Action::LoadOutput(path)),
                    }
                }
            }
            KeyCode::Char(c) => {
                self.path.insert_char(c);
                None
            }
            KeyCode::Backspace => {
                self.path.backspace();
                None
            }
            KeyCode::Delete => {
                self.path.delete();
                None
            }
            KeyCode::Left => {
                self.path.move_left();
                None
            }
            KeyCode::Right => {
                self.path.move_right();
                None
            }
            KeyCode::Home => {
                self.path.home();
                None
            }
            KeyCode::End => {
                self.path.end();
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let popup_area = centered_popup(area, 70.min(area.width), 8);
        frame.render_widget(Clear, popup_area);

        let mut input = vec![Span::styled("> ", Style::default().fg(Color::Cyan))];
        input.extend(cursor_spans(
            self.path.text(),
            self.path.cursor(),
            Style::default().fg(Color::White),
        ));

        let content = vec![
            Line::from(Span::styled(
                "File name or path (bare names go to save_config/):",
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(input),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    " Enter ",
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(match self.mode {
                    FileMode::Save => "Save  ",
                    FileMode::Load => "Load  ",
                }),
                Span::styled(
                    " Esc ",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::raw("Cancel"),
            ]),
        ];

        let paragraph = Paragraph::new(content).block(
            Block::default()
                .borders(Borders::ALL)
                .title(self.mode.title())
                .title_style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(paragraph, popup_area);
        Ok(())
    }
}
