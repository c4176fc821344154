//! Connection settings dialog
//!
//! Edits the PostgreSQL connection entry. The App reads the edited config
//! back with [`ConnectionDialog::config`] and reports test results through
//! [`ConnectionDialog::set_result`].

use crate::action::Action;
use crate::component::Component;
use crate::components::centered_popup;
use crate::components::text_input::cursor_spans;
use crate::model::connection::ConnectionConfig;
use crate::model::field::TextControl;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

/// Input rows, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionField {
    Host,
    Port,
    Database,
    User,
    Password,
}

impl ConnectionField {
    const ALL: [ConnectionField; 5] = [
        ConnectionField::Host,
        ConnectionField::Port,
        ConnectionField::Database,
        ConnectionField::User,
        ConnectionField::Password,
    ];

    fn label(&self) -> &'static str {
        match self {
            ConnectionField::Host => "Host",
            ConnectionField::Port => "Port",
            ConnectionField::Database => "Database",
            ConnectionField::User => "User",
            ConnectionField::Password => "Password",
        }
    }
}

pub struct ConnectionDialog {
    name: String,
    inputs: Vec<TextControl>,
    focus: usize,
    /// Validation problem or last test outcome
    result: Option<(bool, String)>,
    testing: bool,
}

impl ConnectionDialog {
    pub fn new(name: &str, config: &ConnectionConfig) -> Self {
        let values = [
            config.host.clone(),
            config.port.to_string(),
            config.dbname.clone(),
            config.user.clone(),
            config.password.clone(),
        ];
        let inputs = ConnectionField::ALL
            .iter()
            .zip(values)
            .map(|(field, value)| TextControl::new(field.label(), value))
            .collect();
        Self {
            name: name.to_string(),
            inputs,
            focus: 0,
            result: None,
            testing: false,
        }
    }

    pub fn focused_field(&self) -> ConnectionField {
        ConnectionField::ALL[self.focus]
    }

    fn text(&self, field: ConnectionField) -> &str {
        let index = ConnectionField::ALL
            .iter()
            .position(|f| *f == field)
            .unwrap_or(0);
        self.inputs[index].text()
    }

    /// The edited settings; a bad port is reported instead of guessed
    pub fn config(&self) -> Result<ConnectionConfig, String> {
        let port_text = self.text(ConnectionField::Port).trim();
        let port = port_text
            .parse::<u16>()
            .map_err(|_| format!("Port must be a number between 0 and 65535, got '{}'", port_text))?;
        let host = self.text(ConnectionField::Host).trim();
        if host.is_empty() {
            return Err("Host is required".to_string());
        }
        Ok(ConnectionConfig {
            host: host.to_string(),
            port,
            dbname: self.text(ConnectionField::Database).trim().to_string(),
            user: self.text(ConnectionField::User).trim().to_string(),
            password: self.text(ConnectionField::Password).to_string(),
        })
    }

    pub fn set_testing(&mut self) {
        self.testing = true;
        self.result = None;
    }

    pub fn set_result(&mut self, ok: bool, message: impl Into<String>) {
        self.testing = false;
        self.result = Some((ok, message.into()));
    }

    fn edit_input(&mut self, code: KeyCode) {
        let input = &mut self.inputs[self.focus];
        match code {
            KeyCode::Char(c) => {
                input.insert_char(c);
            }
            KeyCode::Backspace => {
                input.backspace();
            }
            KeyCode::Delete => {
                input.delete();
            }
            KeyCode::Left => input.move_left(),
            KeyCode::Right => input.move_right(),
            KeyCode::Home => input.home(),
            KeyCode::End => input.end(),
            _ => {}
        }
    }

    /// Validate, then hand `action` to the App
    fn submit(&mut self, action: Action) -> Option<Action> {
        match self.config() {
            Ok(_) => Some(action),
            Err(problem) => {
                self.result = Some((false, problem));
                None
            }
        }
    }
}

impl Component for ConnectionDialog {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let action = match key.code {
            KeyCode::Esc => Some(Action::CloseModal),
            KeyCode::Char('t') if ctrl => self.submit(Action::TestConnection),
            KeyCode::Char('s') if ctrl => self.submit(Action::SaveConnection),
            KeyCode::Enter => self.submit(Action::Connect),
            KeyCode::Tab | KeyCode::Down => {
                self.focus = (self.focus + 1) % self.inputs.len();
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = (self.focus + self.inputs.len() - 1) % self.inputs.len();
                None
            }
            code => {
                self.edit_input(code);
                None
            }
        };
        Ok(action)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let popup_area = centered_popup(area, 64.min(area.width), 16);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!(" PostgreSQL connection '{}' ", self.name))
            .title_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .border_style(Style::default().fg(Color::Cyan));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(ConnectionField::ALL.len() as u16),
                Constraint::Length(1),
                Constraint::Min(2),
                Constraint::Length(2),
            ])
            .split(inner);

        let mut rows = Vec::new();
        for (i, field) in ConnectionField::ALL.iter().enumerate() {
            let focused = *field == self.focused_field();
            let input = &self.inputs[i];
            let shown: String = match field {
                ConnectionField::Password => "•".repeat(input.text().chars().count()),
                _ => input.text().to_string(),
            };
            let marker = if focused { "▶ " } else { "  " };
            let mut spans = vec![
                Span::styled(marker, Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!("{:10}", field.label()),
                    Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }),
                ),
            ];
            if focused {
                spans.extend(cursor_spans(
                    &shown,
                    input.cursor(),
                    Style::default().fg(Color::White),
                ));
            } else {
                spans.push(Span::styled(shown, Style::default().fg(Color::White)));
            }
            rows.push(Line::from(spans));
        }
        frame.render_widget(Paragraph::new(rows), chunks[1]);

        let status = if self.testing {
            Line::from(Span::styled(
                "Testing connection...",
                Style::default().fg(Color::Yellow),
            ))
        } else {
            match &self.result {
                Some((true, message)) => Line::from(Span::styled(
                    format!("✓ {}", message),
                    Style::default().fg(Color::Green),
                )),
                Some((false, message)) => Line::from(Span::styled(
                    format!("✗ {}", message),
                    Style::default().fg(Color::Red),
                )),
                None => Line::from(""),
            }
        };
        frame.render_widget(
            Paragraph::new(status).wrap(ratatui::widgets::Wrap { trim: true }),
            chunks[3],
        );

        let help = Line::from(vec![
            Span::styled(" Enter ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::raw("Connect  "),
            Span::styled(" ^T ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw("Test  "),
            Span::styled(" ^S ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw("Save  "),
            Span::styled(" Esc ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw("Close"),
        ]);
        frame.render_widget(Paragraph::new(help), chunks[4]);
        Ok(())
    }
}
