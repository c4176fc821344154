//! Form component - Pages of schema-driven fields
//!
//! Holds one control per rendered field. Every edit comes back out of
//! `update` as `Action::FieldChanged`, which the App applies to the output
//! model; the form never touches the model itself.

use crate::action::Action;
use crate::component::Component;
use crate::components::layout::calculate_form_layout;
use crate::components::table::{draw_table, fit};
use crate::components::text_input::cursor_spans;
use crate::errors::{AppError, AppResult};
use crate::model::field::{coerce_bool, FieldControl, TextControl};
use crate::model::output::{FieldChange, OutputModel};
use crate::model::schema::{FieldDefinition, FieldSchema, FieldType, PagesDocument};
use crate::model::table::TableModel;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// Form State
// ═══════════════════════════════════════════════════════════════════════════════

/// A rendered field: its definition and live control
#[derive(Debug, Clone)]
pub struct FieldEntry {
    pub def: FieldDefinition,
    pub control: FieldControl,
}

/// A page: title plus indices into the entry list
#[derive(Debug, Clone)]
pub struct FormPage {
    pub title: String,
    pub entries: Vec<usize>,
}

/// In-progress edit
#[derive(Debug, Clone, PartialEq)]
enum Editing {
    /// Keystrokes go straight into the focused text field; Esc puts back `original`
    InPlace { original: String },
    /// Keystrokes go into a scratch line that is parsed on commit
    Buffer(TextControl),
}

pub struct FormComponent {
    entries: Vec<FieldEntry>,
    pages: Vec<FormPage>,
    page: usize,
    field: usize,
    editing: Option<Editing>,
    table_focus: bool,
    tag_cursor: usize,
    scripted: HashSet<String>,
    list_state: ListState,
}

impl FormComponent {
    /// Build the controls for every page field
    ///
    /// Returns the initial change of every control so the caller can seed the
    /// output model. Without a pages document all fields go on one page.
    pub fn build(
        schema: &FieldSchema,
        pages: &PagesDocument,
        output: &OutputModel,
    ) -> AppResult<(Self, Vec<FieldChange>)> {
        let mut entries: Vec<FieldEntry> = Vec::new();
        let mut form_pages = Vec::new();
        let mut changes = Vec::new();

        let layout: Vec<(String, Vec<String>)> = if pages.pages.is_empty() {
            vec![("Fields".to_string(), schema.keys().map(str::to_string).collect())]
        } else {
            pages
                .pages
                .iter()
                .map(|p| (p.display_title().to_string(), p.fields.clone()))
                .collect()
        };

        for (title, keys) in layout {
            let mut indices = Vec::new();
            for key in keys {
                let Some(def) = schema.get(&key) else {
                    warn!("page '{}' references unknown field '{}'", title, key);
                    continue;
                };
                if let Some(existing) = entries.iter().position(|e| e.def.key == key) {
                    indices.push(existing);
                    continue;
                }
                let control = FieldControl::create(def, output)?;
                changes.push(control.initial_change());
                indices.push(entries.len());
                entries.push(FieldEntry {
                    def: def.clone(),
                    control,
                });
            }
            form_pages.push(FormPage {
                title,
                entries: indices,
            });
        }

        debug!(
            "form built: {} pages, {} fields",
            form_pages.len(),
            entries.len()
        );

        let mut list_state = ListState::default();
        list_state.select(Some(0));
        let form = Self {
            entries,
            pages: form_pages,
            page: 0,
            field: 0,
            editing: None,
            table_focus: false,
            tag_cursor: 0,
            scripted: HashSet::new(),
            list_state,
        };
        Ok((form, changes))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    pub fn pages(&self) -> &[FormPage] {
        &self.pages
    }

    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    fn focused_index(&self) -> Option<usize> {
        self.pages
            .get(self.page)
            .and_then(|p| p.entries.get(self.field))
            .copied()
    }

    pub fn focused_entry(&self) -> Option<&FieldEntry> {
        self.focused_index().and_then(|i| self.entries.get(i))
    }

    fn focused_entry_mut(&mut self) -> Option<&mut FieldEntry> {
        let index = self.focused_index()?;
        self.entries.get_mut(index)
    }

    pub fn focused_key(&self) -> Option<&str> {
        self.focused_entry().map(|e| e.def.key.as_str())
    }

    pub fn is_editing(&self) -> bool {
        self.editing.is_some()
    }

    pub fn in_table(&self) -> bool {
        self.table_focus
    }

    /// Mark the text fields that have a stored script
    pub fn set_scripted<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scripted = keys.into_iter().map(Into::into).collect();
    }

    /// Focused field key when it is a text field with a script
    pub fn focused_script_key(&self) -> Option<&str> {
        self.focused_entry()
            .filter(|e| e.def.field_type == FieldType::Text && self.scripted.contains(&e.def.key))
            .map(|e| e.def.key.as_str())
    }

    pub fn control_mut(&mut self, key: &str) -> Option<&mut FieldControl> {
        self.entries
            .iter_mut()
            .find(|e| e.def.key == key)
            .map(|e| &mut e.control)
    }

    pub fn table_mut(&mut self, key: &str) -> Option<&mut TableModel> {
        match self.control_mut(key) {
            Some(FieldControl::Table(table)) => Some(table),
            _ => None,
        }
    }

    /// The focused table field, else the first table on the current page
    pub fn active_table_key(&self) -> Option<&str> {
        if let Some(entry) = self.focused_entry() {
            if entry.def.field_type == FieldType::Table {
                return Some(&entry.def.key);
            }
        }
        self.pages.get(self.page).and_then(|p| {
            p.entries
                .iter()
                .filter_map(|&i| self.entries.get(i))
                .find(|e| e.def.field_type == FieldType::Table)
                .map(|e| e.def.key.as_str())
        })
    }

    /// First table field across all pages; query results land here
    pub fn first_table_key(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.def.field_type == FieldType::Table)
            .map(|e| e.def.key.as_str())
    }

    fn active_table_mut(&mut self) -> Option<&mut TableModel> {
        let key = self.active_table_key()?.to_string();
        self.table_mut(&key)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Updates
    // ─────────────────────────────────────────────────────────────────────────

    /// Sync every control to a loaded document; keys without a control are left alone
    pub fn load_values(&mut self, values: &Map<String, Value>) -> AppResult<Vec<FieldChange>> {
        self.editing = None;
        self.table_focus = false;
        let mut changes = Vec::new();
        for entry in &mut self.entries {
            if let Some(value) = values.get(&entry.def.key) {
                changes.push(entry.control.load_value(value)?);
            }
        }
        Ok(changes)
    }

    /// Set a text-like field from outside the form (hooks)
    pub fn set_text_value(&mut self, key: &str, text: &str) -> AppResult<Option<FieldChange>> {
        match self.control_mut(key) {
            Some(control) => Ok(Some(control.load_value(&Value::String(text.to_string()))?)),
            None => Ok(None),
        }
    }

    pub fn clear_table(&mut self, key: &str) -> AppResult<FieldChange> {
        self.table_mut(key)
            .map(TableModel::clear)
            .ok_or_else(|| AppError::Wiring(format!("'{}' is not a table field", key)))
    }

    pub fn populate_table(
        &mut self,
        key: &str,
        rows: &[Map<String, Value>],
    ) -> AppResult<FieldChange> {
        let table = self
            .table_mut(key)
            .ok_or_else(|| AppError::Wiring(format!("'{}' is not a table field", key)))?;
        table.populate(rows)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────────

    fn reset_focus(&mut self) {
        self.editing = None;
        self.table_focus = false;
        self.tag_cursor = 0;
        self.list_state.select(Some(self.field));
    }

    pub fn next_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.page = (self.page + 1) % self.pages.len();
        self.field = 0;
        self.reset_focus();
    }

    pub fn prev_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.page = (self.page + self.pages.len() - 1) % self.pages.len();
        self.field = 0;
        self.reset_focus();
    }

    fn field_count(&self) -> usize {
        self.pages.get(self.page).map_or(0, |p| p.entries.len())
    }

    pub fn next_field(&mut self) {
        let count = self.field_count();
        if count == 0 {
            return;
        }
        self.field = (self.field + 1) % count;
        self.reset_focus();
    }

    pub fn prev_field(&mut self) {
        let count = self.field_count();
        if count == 0 {
            return;
        }
        self.field = (self.field + count - 1) % count;
        self.reset_focus();
    }

    fn focus_table(&mut self) {
        if let Some(entry) = self.focused_entry() {
            if entry.def.field_type == FieldType::Table {
                self.table_focus = true;
                return;
            }
        }
        let Some(key) = self.active_table_key().map(str::to_string) else {
            return;
        };
        if let Some(pos) = self.pages[self.page]
            .entries
            .iter()
            .position(|&i| self.entries[i].def.key == key)
        {
            self.field = pos;
            self.reset_focus();
            self.table_focus = true;
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    fn begin_edit(&mut self) -> AppResult<Option<Action>> {
        if self.table_focus {
            return self.begin_cell_edit();
        }
        let Some(entry) = self.focused_entry_mut() else {
            return Ok(None);
        };
        let (editing, action) = match &mut entry.control {
            FieldControl::Text(c) => (
                Some(Editing::InPlace {
                    original: c.text().to_string(),
                }),
                None,
            ),
            FieldControl::Select(c) => (
                Some(Editing::Buffer(TextControl::new(c.key.clone(), c.display()))),
                None,
            ),
            FieldControl::Number(c) => (
                Some(Editing::Buffer(TextControl::new(
                    c.key.clone(),
                    c.get().to_string(),
                ))),
                None,
            ),
            FieldControl::Tags(c) => (
                Some(Editing::Buffer(TextControl::new(c.key.clone(), ""))),
                None,
            ),
            FieldControl::Boolean(c) => (None, Some(Action::FieldChanged(c.toggle()))),
            FieldControl::Table(_) => (None, Some(Action::FocusTable)),
        };
        self.editing = editing;
        Ok(action)
    }

    fn begin_cell_edit(&mut self) -> AppResult<Option<Action>> {
        let Some(table) = self.active_table_mut() else {
            return Ok(None);
        };
        if table.row_count() == 0 {
            return Ok(None);
        }
        if table.cursor_on_action() {
            return Ok(Some(Action::DeleteRow));
        }
        let Some(cell) = table.cursor_cell_mut() else {
            return Ok(None);
        };
        let key = cell.key().to_string();
        let prefill = match cell {
            FieldControl::Boolean(c) => {
                let checked = !c.checked();
                let (row, _) = table.cursor();
                let change = table.set_cell(row, &key, &Value::Bool(checked))?;
                return Ok(Some(Action::FieldChanged(change)));
            }
            FieldControl::Number(c) => c.get().to_string(),
            other => other.display(),
        };
        self.editing = Some(Editing::Buffer(TextControl::new(key, prefill)));
        Ok(None)
    }

    /// Apply a key to the edit line, returning a change for in-place edits
    fn edit_line(&mut self, apply: impl FnOnce(&mut TextControl) -> Option<FieldChange>) -> Option<Action> {
        if let Editing::Buffer(buffer) = self.editing.as_mut()? {
            apply(buffer);
            return None;
        }
        match self.focused_entry_mut().map(|e| &mut e.control) {
            Some(FieldControl::Text(text)) => apply(text).map(Action::FieldChanged),
            _ => None,
        }
    }

    fn commit_edit(&mut self) -> AppResult<Option<Action>> {
        let Some(editing) = self.editing.take() else {
            return Ok(None);
        };
        let Editing::Buffer(buffer) = editing else {
            return Ok(None);
        };
        let text = buffer.text().to_string();

        if self.table_focus {
            let Some(table) = self.active_table_mut() else {
                return Ok(None);
            };
            let changed = match table.cursor_cell_mut() {
                Some(cell) => commit_text(cell, &text)?.is_some(),
                None => false,
            };
            return Ok(changed.then(|| Action::FieldChanged(table.change())));
        }

        let Some(entry) = self.focused_entry_mut() else {
            return Ok(None);
        };
        let is_tags = matches!(entry.control, FieldControl::Tags(_));
        let change = commit_text(&mut entry.control, &text)?;
        if is_tags && change.is_some() {
            // keep the tag line open for the next tag
            self.editing = Some(Editing::Buffer(TextControl::new(buffer.key, "")));
        }
        Ok(change.map(Action::FieldChanged))
    }

    fn toggle_field(&mut self) -> AppResult<Option<Action>> {
        if self.table_focus {
            let Some(table) = self.active_table_mut() else {
                return Ok(None);
            };
            let (row, _) = table.cursor();
            let flipped = match table.cursor_cell_mut() {
                Some(FieldControl::Boolean(c)) => Some((c.key.clone(), !c.checked())),
                Some(FieldControl::Select(c)) => {
                    let stepped = c.step(true).is_some();
                    return Ok(stepped.then(|| Action::FieldChanged(table.change())));
                }
                _ => None,
            };
            return match flipped {
                Some((key, checked)) => {
                    let change = table.set_cell(row, &key, &Value::Bool(checked))?;
                    Ok(Some(Action::FieldChanged(change)))
                }
                None => Ok(None),
            };
        }
        let Some(entry) = self.focused_entry_mut() else {
            return Ok(None);
        };
        let action = match &mut entry.control {
            FieldControl::Boolean(c) => Some(Action::FieldChanged(c.toggle())),
            FieldControl::Select(c) => c.step(true).map(Action::FieldChanged),
            _ => None,
        };
        Ok(action)
    }

    /// Drop the edit; in-place text goes back to its value from before the edit
    fn cancel_edit(&mut self) -> Option<Action> {
        let Some(Editing::InPlace { original }) = self.editing.take() else {
            return None;
        };
        match &mut self.focused_entry_mut()?.control {
            FieldControl::Text(text) if text.text() != original => {
                Some(Action::FieldChanged(text.set_text(original)))
            }
            _ => None,
        }
    }

    fn step_field(&mut self, delta: i64) -> Option<Action> {
        let mut tag_count = 0;
        let action = match &mut self.focused_entry_mut()?.control {
            FieldControl::Select(c) => c.step(delta > 0).map(Action::FieldChanged),
            FieldControl::Number(c) => Some(Action::FieldChanged(c.step(delta))),
            FieldControl::Boolean(c) => Some(Action::FieldChanged(c.toggle())),
            FieldControl::Tags(c) => {
                tag_count = c.tags().len();
                None
            }
            _ => None,
        };
        if tag_count > 0 {
            let next = self.tag_cursor as i64 + delta.signum();
            self.tag_cursor = next.clamp(0, tag_count as i64 - 1) as usize;
        }
        action
    }

    fn remove_tag(&mut self) -> AppResult<Option<Action>> {
        let index = self.tag_cursor;
        let Some(FieldControl::Tags(tags)) = self.focused_entry_mut().map(|e| &mut e.control)
        else {
            return Ok(None);
        };
        if tags.tags().is_empty() {
            return Ok(None);
        }
        let change = tags.remove(index)?;
        let remaining = tags.tags().len();
        self.tag_cursor = index.min(remaining.saturating_sub(1));
        Ok(Some(Action::FieldChanged(change)))
    }

    fn add_row(&mut self) -> AppResult<Option<Action>> {
        let Some(table) = self.active_table_mut() else {
            return Ok(None);
        };
        let change = table.add_row(None)?;
        Ok(Some(Action::FieldChanged(change)))
    }

    fn delete_row(&mut self) -> AppResult<Option<Action>> {
        let Some(table) = self.active_table_mut() else {
            return Ok(None);
        };
        if table.row_count() == 0 {
            return Ok(None);
        }
        let (row, _) = table.cursor();
        let change = table.remove_row(row)?;
        Ok(Some(Action::FieldChanged(change)))
    }

    fn edit_buffer(&self) -> Option<&TextControl> {
        match &self.editing {
            Some(Editing::Buffer(buffer)) => Some(buffer),
            _ => None,
        }
    }
}

/// Parse committed edit text into a control
fn commit_text(control: &mut FieldControl, text: &str) -> AppResult<Option<FieldChange>> {
    let change = match control {
        FieldControl::Text(c) => Some(c.set_text(text)),
        FieldControl::Select(c) => {
            let name = text.trim();
            (!name.is_empty()).then(|| c.set_display(name))
        }
        FieldControl::Number(c) => text.trim().parse::<i64>().ok().map(|n| c.set(n)),
        FieldControl::Boolean(c) => Some(c.set_checked(coerce_bool(&Value::String(text.to_string())))),
        FieldControl::Tags(c) => {
            c.input = text.to_string();
            c.commit()
        }
        FieldControl::Table(t) => {
            return Err(AppError::Wiring(format!(
                "table '{}' cannot take text input",
                t.key()
            )))
        }
    };
    Ok(change)
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component Implementation
// ═══════════════════════════════════════════════════════════════════════════════

impl Component for FormComponent {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.editing.is_some() {
            let action = match key.code {
                KeyCode::Enter => Some(Action::CommitEdit),
                KeyCode::Esc => Some(Action::CancelEdit),
                KeyCode::Backspace => Some(Action::EditBackspace),
                KeyCode::Delete => Some(Action::EditDelete),
                KeyCode::Left => Some(Action::EditLeft),
                KeyCode::Right => Some(Action::EditRight),
                KeyCode::Home => Some(Action::EditHome),
                KeyCode::End => Some(Action::EditEnd),
                KeyCode::Char(c) => Some(Action::EditInput(c)),
                _ => None,
            };
            return Ok(action);
        }

        if self.table_focus {
            let action = match key.code {
                KeyCode::Up | KeyCode::Char('k') => Some(Action::TableMove(-1, 0)),
                KeyCode::Down | KeyCode::Char('j') => Some(Action::TableMove(1, 0)),
                KeyCode::Left | KeyCode::Char('h') => Some(Action::TableMove(0, -1)),
                KeyCode::Right | KeyCode::Char('l') => Some(Action::TableMove(0, 1)),
                KeyCode::Enter => Some(Action::BeginEdit),
                KeyCode::Char(' ') => Some(Action::ToggleField),
                KeyCode::Char('a') => Some(Action::AddRow),
                KeyCode::Char('x') | KeyCode::Delete => Some(Action::DeleteRow),
                KeyCode::Char('C') => Some(Action::OpenClearTable),
                KeyCode::Esc => Some(Action::LeaveTable),
                _ => None,
            };
            if action.is_some() {
                return Ok(action);
            }
        }

        let on_tags = matches!(
            self.focused_entry().map(|e| &e.control),
            Some(FieldControl::Tags(_))
        );
        let action = match key.code {
            // Navigation
            KeyCode::Tab => Some(Action::NextPage),
            KeyCode::BackTab => Some(Action::PrevPage),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::NextField),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::PrevField),

            // Editing
            KeyCode::Enter => Some(Action::BeginEdit),
            KeyCode::Char(' ') => Some(Action::ToggleField),
            KeyCode::Left | KeyCode::Char('h') => Some(Action::StepField(-1)),
            KeyCode::Right | KeyCode::Char('l') => Some(Action::StepField(1)),

            // Table
            KeyCode::Char('t') => Some(Action::FocusTable),
            KeyCode::Char('a') => Some(Action::AddRow),
            KeyCode::Char('x') | KeyCode::Delete if on_tags => Some(Action::RemoveTag),
            KeyCode::Char('x') | KeyCode::Delete => Some(Action::DeleteRow),
            KeyCode::Char('C') => Some(Action::OpenClearTable),

            // Files and views
            KeyCode::Char('s') => Some(Action::OpenSaveDialog),
            KeyCode::Char('o') => Some(Action::OpenLoadDialog),
            KeyCode::Char('v') => Some(Action::OpenJsonView),

            // Database
            KeyCode::Char('c') => Some(Action::OpenConnectionDialog),
            KeyCode::Char('e') => Some(Action::OpenScriptEditor),
            KeyCode::Char('r') => Some(Action::RunScript),
            KeyCode::Char('E') => Some(Action::ShowConnectionError),
            KeyCode::Esc => Some(Action::CancelQuery),

            KeyCode::Char('?') => Some(Action::OpenHelp),
            KeyCode::Char('q') => Some(Action::OpenQuitDialog),
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        let follow_up = match action {
            Action::NextPage => {
                self.next_page();
                None
            }
            Action::PrevPage => {
                self.prev_page();
                None
            }
            Action::NextField => {
                self.next_field();
                None
            }
            Action::PrevField => {
                self.prev_field();
                None
            }
            Action::BeginEdit => self.begin_edit()?,
            Action::CommitEdit => self.commit_edit()?,
            Action::CancelEdit => self.cancel_edit(),
            Action::EditInput(c) => self.edit_line(|line| Some(line.insert_char(c))),
            Action::EditBackspace => self.edit_line(TextControl::backspace),
            Action::EditDelete => self.edit_line(TextControl::delete),
            Action::EditLeft => self.edit_line(|line| {
                line.move_left();
                None
            }),
            Action::EditRight => self.edit_line(|line| {
                line.move_right();
                None
            }),
            Action::EditHome => self.edit_line(|line| {
                line.home();
                None
            }),
            Action::EditEnd => self.edit_line(|line| {
                line.end();
                None
            }),
            Action::ToggleField => self.toggle_field()?,
            Action::StepField(delta) => self.step_field(delta),
            Action::RemoveTag => self.remove_tag()?,
            Action::FocusTable => {
                self.focus_table();
                None
            }
            Action::LeaveTable => {
                self.table_focus = false;
                self.editing = None;
                None
            }
            Action::TableMove(d_row, d_col) => {
                if let Some(table) = self.active_table_mut() {
                    table.move_cursor(d_row, d_col);
                }
                None
            }
            Action::AddRow => self.add_row()?,
            Action::DeleteRow => self.delete_row()?,
            _ => None,
        };
        Ok(follow_up)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let has_table = self.pages.get(self.page).is_some_and(|p| {
            p.entries
                .iter()
                .any(|&i| self.entries[i].def.field_type == FieldType::Table)
        });
        let layout = calculate_form_layout(area, has_table);

        self.render_tabs(frame, layout.tabs);
        self.render_field_list(frame, layout.list);
        self.render_detail(frame, layout.detail);

        if let Some(table_area) = layout.table {
            if let Some(key) = self.active_table_key().map(str::to_string) {
                let title = self
                    .entries
                    .iter()
                    .find(|e| e.def.key == key)
                    .map(|e| e.def.name.clone())
                    .unwrap_or_default();
                let buffer = if self.table_focus { self.edit_buffer() } else { None };
                if let Some(FieldControl::Table(table)) =
                    self.entries.iter().find(|e| e.def.key == key).map(|e| &e.control)
                {
                    draw_table(frame, table_area, &title, table, self.table_focus, buffer);
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Rendering Functions
// ═══════════════════════════════════════════════════════════════════════════════

impl FormComponent {
    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<&str> = self.pages.iter().map(|p| p.title.as_str()).collect();
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::BOTTOM))
            .select(self.page)
            .style(Style::default().fg(Color::DarkGray))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn render_field_list(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .pages
            .get(self.page)
            .map(|p| p.entries.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&i| self.entries.get(i))
            .map(|entry| {
                let marker = if self.scripted.contains(&entry.def.key) {
                    "⚡"
                } else {
                    " "
                };
                let value = match entry.control {
                    FieldControl::Table(_) | FieldControl::Boolean(_) => entry.control.display(),
                    _ => fit(&entry.control.display(), 16)
                        .trim_end()
                        .to_string(),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", marker), Style::default().fg(Color::Yellow)),
                    Span::styled(entry.def.name.clone(), Style::default().fg(Color::White)),
                    Span::styled(format!("  {}", value), Style::default().fg(Color::DarkGray)),
                ]))
            })
            .collect();

        let count = items.len();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" Fields ({}) ", count))
                    .border_style(Style::default().fg(if self.table_focus {
                        Color::DarkGray
                    } else {
                        Color::Cyan
                    })),
            )
            .highlight_style(
                Style::default()
                    .bg(Color::Blue)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("▶ ");

        self.list_state.select(if count == 0 { None } else { Some(self.field) });
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Field ")
            .border_style(Style::default().fg(Color::DarkGray));

        let Some(entry) = self.focused_entry() else {
            let empty = Paragraph::new(Line::from(Span::styled(
                "No fields defined. Add some to config/config_fields.json.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(empty, area);
            return;
        };

        let label = Style::default().fg(Color::DarkGray);
        let mut lines = vec![
            Line::from(Span::styled(
                entry.def.name.clone(),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::styled("key: ", label),
                Span::styled(entry.def.key.clone(), Style::default().fg(Color::Cyan)),
                Span::styled("  type: ", label),
                Span::styled(entry.def.field_type.label(), Style::default().fg(Color::Cyan)),
            ]),
        ];
        if let Some(help) = &entry.def.help {
            lines.push(Line::from(Span::styled(help.clone(), label)));
        }
        lines.push(Line::from(""));
        lines.push(self.value_line(entry));

        if let FieldControl::Select(select) = &entry.control {
            let names: Vec<&str> = select.options().iter().map(|o| o.name.as_str()).collect();
            lines.push(Line::from(Span::styled(
                format!("options: {}", names.join(" | ")),
                label,
            )));
        }
        if let FieldControl::Number(number) = &entry.control {
            let (min, max) = number.bounds();
            lines.push(Line::from(Span::styled(
                format!("range: {} .. {}", min, max),
                label,
            )));
        }
        if self.focused_script_key().is_some() {
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled(" e ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
                Span::styled("edit script  ", label),
                Span::styled(" r ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
                Span::styled("run script", label),
            ]));
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn value_line(&self, entry: &FieldEntry) -> Line<'static> {
        let editing = self.editing.is_some() && !self.table_focus;
        let value_style = Style::default().fg(if editing { Color::Yellow } else { Color::White });

        let mut spans = vec![Span::styled("value: ", Style::default().fg(Color::DarkGray))];
        match (&self.editing, &entry.control) {
            (Some(Editing::InPlace { .. }), FieldControl::Text(text)) if editing => {
                spans.extend(cursor_spans(text.text(), text.cursor(), value_style));
            }
            (Some(Editing::Buffer(buffer)), FieldControl::Tags(tags)) if editing => {
                spans.push(Span::styled(
                    format!("[{}] + ", tags.tags().join(", ")),
                    Style::default().fg(Color::White),
                ));
                spans.extend(cursor_spans(buffer.text(), buffer.cursor(), value_style));
            }
            (Some(Editing::Buffer(buffer)), _) if editing => {
                spans.extend(cursor_spans(buffer.text(), buffer.cursor(), value_style));
            }
            (_, FieldControl::Text(text)) if text.text().is_empty() => {
                let hint = entry.def.placeholder.clone().unwrap_or_default();
                spans.push(Span::styled(
                    hint,
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::ITALIC),
                ));
            }
            (_, FieldControl::Tags(tags)) => {
                for (i, tag) in tags.tags().iter().enumerate() {
                    let style = if i == self.tag_cursor {
                        Style::default().fg(Color::Black).bg(Color::Cyan)
                    } else {
                        Style::default().fg(Color::Cyan)
                    };
                    spans.push(Span::styled(format!(" {} ", tag), style));
                    spans.push(Span::raw(" "));
                }
            }
            (_, control) => spans.push(Span::styled(control.display(), value_style)),
        }
        Line::from(spans)
    }
}
