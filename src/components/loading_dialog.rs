//! Loading overlay shown while a connect or query job runs

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use std::time::Instant;

const FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct LoadingDialog {
    label: String,
    started: Instant,
    frame: usize,
}

impl LoadingDialog {
    pub fn new(label: impl Into<String>, started: Instant) -> Self {
        Self {
            label: label.into(),
            started,
            frame: 0,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Component for LoadingDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let action = match key.code {
            KeyCode::Esc | KeyCode::Char('c') => Some(Action::CancelQuery),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if action == Action::Tick {
            self.frame = (self.frame + 1) % FRAMES.len();
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let width = (self.label().chars().count() as u16 + 10).clamp(40, 90);
        let popup_area = centered_popup(area, width, 7);
        frame.render_widget(Clear, popup_area);

        let elapsed = self.started.elapsed().as_secs_f64();
        let content = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!("{} ", FRAMES[self.frame]),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(
                    self.label().to_string(),
                    Style::default()
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  {:.1}s", elapsed),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    " Esc ",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::raw("Cancel"),
            ]),
        ];

        let paragraph = Paragraph::new(content)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Yellow))
                    .title(" Working ")
                    .title_style(
                        Style::default()
                            .fg(Color::Yellow)
                            .add_modifier(Modifier::BOLD),
                    ),
            )
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, popup_area);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    #[test]
    fn test_escape_cancels_and_tick_animates() {
        let mut dialog = LoadingDialog::new("Running script for 'object_name'", Instant::now());
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        assert_eq!(dialog.handle_key_event(esc).unwrap(), Some(Action::CancelQuery));

        for _ in 0..FRAMES.len() + 2 {
            dialog.update(Action::Tick).unwrap();
        }
        assert_eq!(dialog.frame, 2);
    }
}
