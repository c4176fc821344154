//! Root application component
//!
//! The App owns the output model, the live connection settings, the query
//! runner and every child component. Children turn keys into Actions; the
//! App applies them and hands follow-up Actions back to the main loop.

use crate::action::Action;
use crate::component::Component;
use crate::components::{
    calculate_main_layout, centered_popup, ConfirmDialog, ConnectionDialog, FileDialog, FileMode,
    FormComponent, HelpDialog, JsonViewDialog, LoadingDialog, ScriptEditor,
};
use crate::config::{Paths, Settings};
use crate::errors::AppError;
use crate::model::connection::ConnectionConfig;
use crate::model::hooks::{save_file_name_from, FieldHook};
use crate::model::job::{JobKind, JobMessage, JobOutcome};
use crate::model::modal::{Modal, ModalStack};
use crate::model::notification::{Level, NotificationStack};
use crate::model::output::{FieldChange, OutputModel};
use crate::model::schema::{FieldSchema, PagesDocument};
use crate::model::table::bind_result_rows;
use crate::services::obfuscation::{os_user_name, Obfuscator};
use crate::services::query_runner::QueryRunner;
use crate::services::schema_store::{SchemaStore, SqlScriptMap};
use crate::services::JobRunner;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, error, info, warn};

// ═══════════════════════════════════════════════════════════════════════════════
// App Struct
// ═══════════════════════════════════════════════════════════════════════════════

pub struct App {
    pub settings: Settings,
    store: SchemaStore,

    /// Exported configuration; only `apply_change` writes to it
    pub output: OutputModel,
    scripts: SqlScriptMap,
    obfuscator: Option<Obfuscator>,

    /// Live connection settings
    pub connection: ConnectionConfig,
    pub query_runner: QueryRunner,
    pub job_runner: JobRunner,
    /// The running connect job only checks the dialog's settings
    testing_connection: bool,
    last_connection_error: Option<String>,

    /// Default name offered by the save dialog
    pub save_file_name: String,
    pub notifications: NotificationStack,
    pub modals: ModalStack,
    pub should_quit: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Child Components
    // ─────────────────────────────────────────────────────────────────────────
    pub form: FormComponent,
    quit_dialog: ConfirmDialog,
    help_dialog: HelpDialog,
    clear_dialog: Option<ConfirmDialog>,
    json_view: Option<JsonViewDialog>,
    file_dialog: Option<FileDialog>,
    connection_dialog: Option<ConnectionDialog>,
    script_editor: Option<ScriptEditor>,
    loading: Option<LoadingDialog>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// App Implementation
// ═══════════════════════════════════════════════════════════════════════════════

impl App {
    pub fn new(paths: Paths, settings: Settings) -> Result<App> {
        Self::with_runner(paths, settings, QueryRunner::postgres())
    }

    /// Build the app around a given runner and start the first connect
    pub fn with_runner(paths: Paths, settings: Settings, query_runner: QueryRunner) -> Result<App> {
        let store = SchemaStore::new(paths);
        store.init_layout()?;

        let mut notifications = NotificationStack::new();
        let schema = load_schema(&store, &mut notifications);
        let pages = match store.load_pages() {
            Ok(pages) => pages,
            Err(e) => {
                error!("{}", e);
                notifications.error(e.to_string());
                PagesDocument::default()
            }
        };
        for problem in schema.validate(&pages) {
            warn!("{}", problem);
            notifications.warn(problem);
        }

        let scripts = match store.load_scripts() {
            Ok(scripts) => scripts,
            Err(e) => {
                error!("{}", e);
                notifications.error(e.to_string());
                SqlScriptMap::new()
            }
        };

        let obfuscator = match Obfuscator::for_current_user() {
            Ok(obfuscator) => Some(obfuscator),
            Err(e) => {
                warn!("stored passwords unavailable: {}", e);
                None
            }
        };
        let connection = match &obfuscator {
            Some(obfuscator) => store
                .load_connection(&settings.connection_name, obfuscator)
                .unwrap_or_else(|e| {
                    error!("{}", e);
                    notifications.error(e.to_string());
                    ConnectionConfig::default()
                }),
            None => ConnectionConfig::default(),
        };

        let output = OutputModel::from_schema(&schema);
        let (mut form, initial) = FormComponent::build(&schema, &pages, &output)?;
        form.set_scripted(scripts.keys());

        let mut app = App {
            save_file_name: settings.save_file_name.clone(),
            settings,
            store,
            output,
            scripts,
            obfuscator,
            connection,
            query_runner,
            job_runner: JobRunner::new(),
            testing_connection: false,
            last_connection_error: None,
            notifications,
            modals: ModalStack::new(),
            should_quit: false,
            form,
            quit_dialog: ConfirmDialog::quit(),
            help_dialog: HelpDialog::default(),
            clear_dialog: None,
            json_view: None,
            file_dialog: None,
            connection_dialog: None,
            script_editor: None,
            loading: None,
        };

        for change in initial {
            app.apply_change(change)?;
        }
        app.prefill_os_user()?;

        info!(
            "{} started with {} fields on {} pages",
            app.settings.app_name,
            schema.len(),
            app.form.pages().len()
        );
        app.start_connect(false);
        Ok(app)
    }

    /// Apply one control change to the output model, then run its hook
    fn apply_change(&mut self, change: FieldChange) -> Result<()> {
        let key = change.key.clone();
        self.output.apply(change)?;
        if self.settings.hooks.hook_for(&key) == Some(FieldHook::SaveFileName) {
            if let Some(name) = save_file_name_from(&self.output.get_text(&key)) {
                self.save_file_name = name;
            }
        }
        Ok(())
    }

    fn prefill_os_user(&mut self) -> Result<()> {
        let keys: Vec<String> = self
            .settings
            .hooks
            .keys_with(FieldHook::OsUser)
            .map(str::to_string)
            .collect();
        if keys.is_empty() {
            return Ok(());
        }
        let user = os_user_name();
        for key in keys {
            if let Some(change) = self.form.set_text_value(&key, &user)? {
                self.apply_change(change)?;
            }
        }
        Ok(())
    }

    /// Wiring defects go up to `main`; anything else becomes a notification
    fn report(&mut self, err: AppError) -> Result<()> {
        if matches!(err, AppError::Wiring(_)) {
            return Err(err.into());
        }
        error!("{}", err);
        self.notifications.error(err.to_string());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Database
    // ─────────────────────────────────────────────────────────────────────────

    fn start_connect(&mut self, show_overlay: bool) {
        let config = self.connection.clone();
        match self
            .job_runner
            .spawn_connect(self.query_runner.connector(), config)
        {
            Ok(()) => {
                if show_overlay {
                    self.open_loading();
                }
            }
            Err(e) => self.notifications.warn(e.message()),
        }
    }

    fn test_connection(&mut self) {
        let Some(dialog) = self.connection_dialog.as_mut() else {
            return;
        };
        let config = match dialog.config() {
            Ok(config) => config,
            Err(problem) => {
                dialog.set_result(false, problem);
                return;
            }
        };
        match self
            .job_runner
            .spawn_connect(self.query_runner.connector(), config)
        {
            Ok(()) => {
                dialog.set_testing();
                self.testing_connection = true;
            }
            Err(e) => dialog.set_result(false, e.message()),
        }
    }

    fn save_connection(&mut self) {
        let Some(dialog) = self.connection_dialog.as_mut() else {
            return;
        };
        let config = match dialog.config() {
            Ok(config) => config,
            Err(problem) => {
                dialog.set_result(false, problem);
                return;
            }
        };
        let Some(obfuscator) = self.obfuscator.as_ref() else {
            dialog.set_result(false, "Password cannot be stored for this user");
            return;
        };
        match self
            .store
            .save_connection(&self.settings.connection_name, &config, obfuscator)
        {
            Ok(()) => {
                dialog.set_result(true, format!("Saved '{}'", self.settings.connection_name));
                self.notifications
                    .info(format!("Connection settings saved ({})", config.describe()));
                self.connection = config;
            }
            Err(e) => {
                dialog.set_result(false, e.message());
                error!("{}", e);
            }
        }
    }

    fn connect_from_dialog(&mut self) {
        let Some(dialog) = self.connection_dialog.as_mut() else {
            return;
        };
        let config = match dialog.config() {
            Ok(config) => config,
            Err(problem) => {
                dialog.set_result(false, problem);
                return;
            }
        };
        // The live settings must match the session the next connect opens
        if let Some(kind) = self.job_runner.current() {
            dialog.set_result(
                false,
                format!("{} is still running. Wait or cancel it first", kind.label()),
            );
            return;
        }
        self.connection = config;
        self.connection_dialog = None;
        self.modals.remove(&Modal::Connection);
        self.start_connect(true);
    }

    fn run_focused_script(&mut self) -> Result<()> {
        match self.form.focused_script_key().map(str::to_string) {
            Some(key) => self.run_script(key, None),
            None => {
                self.warn_no_script();
                Ok(())
            }
        }
    }

    /// Run the editor's text without saving it first
    fn run_editor_script(&mut self) -> Result<()> {
        let Some(editor) = self.script_editor.as_ref() else {
            return Ok(());
        };
        let (key, script) = (editor.key().to_string(), editor.text());
        self.run_script(key, Some(script))
    }

    /// Run `key`'s script, or `script` when given, on a worker with
    /// `value` bound to the field's text
    fn run_script(&mut self, key: String, script: Option<String>) -> Result<()> {
        let executor = match self.query_runner.executor() {
            Ok(executor) => executor,
            Err(e) => {
                debug!("run refused: {}", e);
                self.notifications
                    .error("Not connected. Press 'c' to set up the connection");
                return Ok(());
            }
        };
        if self.job_runner.is_busy() {
            self.notifications.warn("Another job is still running");
            return Ok(());
        }
        let script = script
            .or_else(|| self.scripts.get(&key).cloned())
            .unwrap_or_default();
        if script.trim().is_empty() {
            self.notifications
                .warn(format!("The script for '{}' is empty. Press 'e' to write one", key));
            return Ok(());
        }
        let Some(target) = self.form.first_table_key().map(str::to_string) else {
            self.notifications.warn("No table field to receive the results");
            return Ok(());
        };

        let mut params = Map::new();
        params.insert("value".to_string(), Value::String(self.output.get_text(&key)));
        let kind = JobKind::Query {
            source_key: key,
            target,
        };
        match self.job_runner.spawn_query(executor, script, params, kind) {
            Ok(()) => self.open_loading(),
            Err(e) => self.report(e)?,
        }
        Ok(())
    }

    fn cancel_job(&mut self) {
        let Some(kind) = self.job_runner.clear() else {
            return;
        };
        if matches!(kind, JobKind::Query { .. }) {
            self.query_runner.cancel();
        }
        if self.testing_connection {
            self.testing_connection = false;
            if let Some(dialog) = self.connection_dialog.as_mut() {
                dialog.set_result(false, "Cancelled");
            }
        }
        self.close_loading();
        self.notifications.warn(format!("{} cancelled", kind.label()));
    }

    fn finish_job(&mut self, outcome: JobOutcome) -> Result<Option<Action>> {
        self.close_loading();
        let JobOutcome {
            kind,
            message,
            elapsed_ms,
        } = outcome;

        match (kind, message) {
            (JobKind::Connect { config }, JobMessage::Connected(result)) => {
                if self.testing_connection {
                    self.testing_connection = false;
                    let (ok, text) = match &result {
                        Ok(_) => (true, format!("Connected to {}", config.describe())),
                        Err(e) => (false, e.message().to_string()),
                    };
                    info!("connection test ({}): {}", config.describe(), text);
                    match self.connection_dialog.as_mut() {
                        Some(dialog) => dialog.set_result(ok, text),
                        None if ok => self.notifications.info(text),
                        None => self.notifications.error(text),
                    }
                    return Ok(None);
                }

                let status = self.query_runner.finish_connect(&config, result);
                if status.connected {
                    self.last_connection_error = None;
                    self.notifications
                        .info(format!("{} ({} ms)", status.message, elapsed_ms));
                } else {
                    self.notifications.error(format!(
                        "Connection to {} failed. Press 'E' for details",
                        config.describe()
                    ));
                    self.last_connection_error = Some(status.message);
                }
                Ok(None)
            }
            (JobKind::Query { source_key, target }, JobMessage::QueryFinished(result)) => {
                let result = match result {
                    Ok(result) => result,
                    Err(e) => {
                        self.report(e)?;
                        return Ok(None);
                    }
                };
                let Some(table) = self.form.table_mut(&target) else {
                    return Err(AppError::Wiring(format!("'{}' is not a table field", target)).into());
                };
                let columns = table.columns().to_vec();
                let rows = match bind_result_rows(&columns, &result.columns, &result.rows) {
                    Ok(rows) => rows,
                    Err(e) => {
                        self.report(e)?;
                        return Ok(None);
                    }
                };
                if result.columns.is_empty() {
                    self.notifications.info(format!(
                        "{} for '{}' done, {} rows affected ({} ms)",
                        result.query_type, source_key, result.affected_rows, elapsed_ms
                    ));
                    return Ok(None);
                }
                let change = match self.form.populate_table(&target, &rows) {
                    Ok(change) => change,
                    Err(e) => {
                        self.report(e)?;
                        return Ok(None);
                    }
                };
                self.notifications.info(format!(
                    "Loaded {} rows into '{}' ({} ms)",
                    rows.len(),
                    target,
                    elapsed_ms
                ));
                Ok(Some(Action::FieldChanged(change)))
            }
            (kind, _) => {
                warn!("job '{}' reported an unexpected result", kind.label());
                Ok(None)
            }
        }
    }

    fn open_loading(&mut self) {
        if let (Some(kind), Some(started)) =
            (self.job_runner.current(), self.job_runner.start_instant())
        {
            self.loading = Some(LoadingDialog::new(kind.label(), started));
            self.modals.push(Modal::Loading);
        }
    }

    fn close_loading(&mut self) {
        self.loading = None;
        self.modals.remove(&Modal::Loading);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────

    fn save_output(&mut self, name: &str) {
        let path = self.store.paths().save_file(name);
        match self.store.save_output(&path, &self.output) {
            Ok(()) => {
                self.save_file_name = file_name_of(&path, name);
                self.notifications.info(format!("Saved {}", path.display()));
                self.close_file_dialog();
            }
            Err(e) => {
                error!("saving {} failed: {}", path.display(), e);
                self.notifications.error(e.to_string());
            }
        }
    }

    fn load_output(&mut self, name: &str) -> Result<()> {
        let path = self.store.paths().save_file(name);
        let values = match self.store.load_output(&path) {
            Ok(values) => values,
            Err(e) => {
                error!("loading {} failed: {}", path.display(), e);
                self.notifications.error(e.to_string());
                return Ok(());
            }
        };

        self.output.replace(values.clone());
        let changes = match self.form.load_values(&values) {
            Ok(changes) => changes,
            Err(e) => return self.report(e),
        };
        for change in changes {
            self.apply_change(change)?;
        }
        self.save_file_name = file_name_of(&path, name);
        self.notifications.info(format!("Loaded {}", path.display()));
        self.close_file_dialog();
        Ok(())
    }

    fn close_file_dialog(&mut self) {
        self.file_dialog = None;
        self.modals.remove(&Modal::SaveAs);
        self.modals.remove(&Modal::LoadFrom);
    }

    fn save_script(&mut self, key: String) {
        let Some(editor) = self.script_editor.as_mut() else {
            return;
        };
        let text = editor.text();
        let previous = self.scripts.insert(key.clone(), text);
        match self.store.save_scripts(&self.scripts) {
            Ok(()) => {
                editor.mark_saved();
                self.form.set_scripted(self.scripts.keys());
                self.notifications.info(format!("Script for '{}' saved", key));
            }
            Err(e) => {
                match previous {
                    Some(previous) => self.scripts.insert(key, previous),
                    None => self.scripts.shift_remove(&key),
                };
                error!("saving scripts failed: {}", e);
                self.notifications.error(e.to_string());
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Modals
    // ─────────────────────────────────────────────────────────────────────────

    fn close_modal(&mut self) {
        match self.modals.pop() {
            Some(Modal::JsonView) => self.json_view = None,
            Some(Modal::SaveAs | Modal::LoadFrom) => self.file_dialog = None,
            Some(Modal::Connection) => self.connection_dialog = None,
            Some(Modal::ScriptEditor { key }) => {
                if self
                    .script_editor
                    .as_ref()
                    .is_some_and(ScriptEditor::is_modified)
                {
                    self.notifications
                        .warn(format!("Unsaved edits to the '{}' script were dropped", key));
                }
                self.script_editor = None;
            }
            Some(Modal::ClearTableConfirm { .. }) => self.clear_dialog = None,
            Some(Modal::Loading) => self.loading = None,
            _ => {}
        }
    }

    fn open_script_editor(&mut self) {
        let Some(key) = self.form.focused_script_key().map(str::to_string) else {
            self.warn_no_script();
            return;
        };
        let script = self.scripts.get(&key).cloned().unwrap_or_default();
        let value = Value::String(self.output.get_text(&key));
        self.script_editor = Some(ScriptEditor::new(key.clone(), &script, value));
        self.modals.push(Modal::ScriptEditor { key });
    }

    fn warn_no_script(&mut self) {
        let message = match self.form.focused_key() {
            Some(key) => format!("'{}' has no SQL script", key),
            None => "No field selected".to_string(),
        };
        self.notifications.warn(message);
    }

    fn open_clear_table(&mut self) {
        let Some(key) = self.form.active_table_key().map(str::to_string) else {
            self.notifications.warn("No table on this page");
            return;
        };
        let name = self
            .form
            .entries()
            .iter()
            .find(|e| e.def.key == key)
            .map(|e| e.def.name.clone())
            .unwrap_or_else(|| key.clone());
        self.clear_dialog = Some(ConfirmDialog::clear_table(&name));
        self.modals.push(Modal::ClearTableConfirm { key });
    }

    fn clear_table(&mut self) -> Result<Option<Action>> {
        let Some(Modal::ClearTableConfirm { key }) = self.modals.top().cloned() else {
            return Ok(None);
        };
        self.close_modal();
        match self.form.clear_table(&key) {
            Ok(change) => {
                self.notifications.info(format!("Cleared '{}'", key));
                Ok(Some(Action::FieldChanged(change)))
            }
            Err(e) => {
                self.report(e)?;
                Ok(None)
            }
        }
    }
}

/// Bare file name for the next save prompt
fn file_name_of(path: &Path, fallback: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

/// Field schema, seeded from the sample template when the config has no fields
fn load_schema(store: &SchemaStore, notifications: &mut NotificationStack) -> FieldSchema {
    match store.load_fields() {
        Ok(schema) if schema.is_empty() => {
            if let Err(e) = store.copy_template_to_config() {
                warn!("no fields configured and no template to copy: {}", e);
                notifications.warn("No fields configured in config/config_fields.json");
                return schema;
            }
            match store.load_fields() {
                Ok(seeded) => {
                    notifications.info("Started from the sample field template");
                    seeded
                }
                Err(e) => {
                    error!("{}", e);
                    notifications.error(e.to_string());
                    FieldSchema::new()
                }
            }
        }
        Ok(schema) => schema,
        Err(e) => {
            error!("{}", e);
            notifications.error(e.to_string());
            FieldSchema::new()
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Component Implementation
// ═══════════════════════════════════════════════════════════════════════════════

impl Component for App {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::ForceQuit));
        }
        match self.modals.top().cloned() {
            Some(modal) => self.handle_modal_key_event(&modal, key),
            None => self.form.handle_key_event(key),
        }
    }

    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        if action != Action::Tick {
            debug!("action: {}", action);
        }
        match action {
            // ─────────────────────────────────────────────────────────────────
            // App Lifecycle
            // ─────────────────────────────────────────────────────────────────
            Action::Tick => {
                if let Some(loading) = self.loading.as_mut() {
                    loading.update(Action::Tick)?;
                }
                if let Some(outcome) = self.job_runner.poll() {
                    return self.finish_job(outcome);
                }
            }
            Action::ForceQuit => {
                info!("quitting");
                self.job_runner.clear();
                self.query_runner.close();
                self.should_quit = true;
            }
            Action::Resize(_, _) => {}

            // ─────────────────────────────────────────────────────────────────
            // Output Model
            // ─────────────────────────────────────────────────────────────────
            Action::FieldChanged(change) => self.apply_change(change)?,

            // ─────────────────────────────────────────────────────────────────
            // Table
            // ─────────────────────────────────────────────────────────────────
            Action::OpenClearTable => self.open_clear_table(),
            Action::ClearTable => return self.clear_table(),

            // ─────────────────────────────────────────────────────────────────
            // Modals
            // ─────────────────────────────────────────────────────────────────
            Action::OpenQuitDialog => self.modals.push(Modal::QuitConfirm),
            Action::OpenHelp => {
                self.help_dialog = HelpDialog::default();
                self.modals.push(Modal::Help);
            }
            Action::OpenJsonView => match self.output.to_json_pretty() {
                Ok(text) => {
                    self.json_view = Some(JsonViewDialog::new(text));
                    self.modals.push(Modal::JsonView);
                }
                Err(e) => self.report(e)?,
            },
            Action::OpenSaveDialog => {
                self.file_dialog = Some(FileDialog::new(FileMode::Save, &self.save_file_name));
                self.modals.push(Modal::SaveAs);
            }
            Action::OpenLoadDialog => {
                self.file_dialog = Some(FileDialog::new(FileMode::Load, &self.save_file_name));
                self.modals.push(Modal::LoadFrom);
            }
            Action::OpenConnectionDialog => {
                self.connection_dialog = Some(ConnectionDialog::new(
                    &self.settings.connection_name,
                    &self.connection,
                ));
                self.modals.push(Modal::Connection);
            }
            Action::OpenScriptEditor => self.open_script_editor(),
            Action::ShowConnectionError => {
                if self.last_connection_error.is_some() {
                    self.modals.push(Modal::ConnectionError);
                } else {
                    self.notifications.info("No connection errors");
                }
            }
            Action::CloseModal => self.close_modal(),

            // ─────────────────────────────────────────────────────────────────
            // Files
            // ─────────────────────────────────────────────────────────────────
            Action::SaveOutput(name) => self.save_output(&name),
            Action::LoadOutput(name) => self.load_output(&name)?,
            Action::SaveScript(key) => self.save_script(key),

            // ─────────────────────────────────────────────────────────────────
            // Database
            // ─────────────────────────────────────────────────────────────────
            Action::TestConnection => self.test_connection(),
            Action::SaveConnection => self.save_connection(),
            Action::Connect => self.connect_from_dialog(),
            Action::RunScript => self.run_focused_script()?,
            Action::RunEditorScript => self.run_editor_script()?,
            Action::CancelQuery => self.cancel_job(),

            // Everything else is form navigation and editing
            other => return self.form.update(other),
        }
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()> {
        let layout = calculate_main_layout(area);

        self.render_title_bar(frame, layout.title);
        self.form.draw(frame, layout.body)?;
        self.render_status_bar(frame, layout.status);
        self.render_help_bar(frame, layout.help);

        let stack: Vec<Modal> = self.modals.iter().cloned().collect();
        for modal in &stack {
            self.draw_modal(frame, area, modal)?;
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helper Methods
// ═══════════════════════════════════════════════════════════════════════════════

impl App {
    fn handle_modal_key_event(&mut self, modal: &Modal, key: KeyEvent) -> Result<Option<Action>> {
        let handled = match modal {
            Modal::QuitConfirm => Some(self.quit_dialog.handle_key_event(key)),
            Modal::Help => Some(self.help_dialog.handle_key_event(key)),
            Modal::JsonView => self.json_view.as_mut().map(|d| d.handle_key_event(key)),
            Modal::SaveAs | Modal::LoadFrom => {
                self.file_dialog.as_mut().map(|d| d.handle_key_event(key))
            }
            Modal::Connection => self
                .connection_dialog
                .as_mut()
                .map(|d| d.handle_key_event(key)),
            Modal::ScriptEditor { .. } => {
                self.script_editor.as_mut().map(|d| d.handle_key_event(key))
            }
            Modal::Loading => self.loading.as_mut().map(|d| d.handle_key_event(key)),
            Modal::ClearTableConfirm { .. } => {
                self.clear_dialog.as_mut().map(|d| d.handle_key_event(key))
            }
            Modal::ConnectionError => {
                let action = match key.code {
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('E') => {
                        Some(Action::CloseModal)
                    }
                    _ => None,
                };
                Some(Ok(action))
            }
        };
        // A modal without its component state cannot take input
        handled.unwrap_or(Ok(Some(Action::CloseModal)))
    }

    fn draw_modal(&mut self, frame: &mut Frame, area: Rect, modal: &Modal) -> Result<()> {
        match modal {
            Modal::QuitConfirm => self.quit_dialog.draw(frame, area)?,
            Modal::Help => self.help_dialog.draw(frame, area)?,
            Modal::JsonView => {
                if let Some(dialog) = self.json_view.as_mut() {
                    dialog.draw(frame, area)?;
                }
            }
            Modal::SaveAs | Modal::LoadFrom => {
                if let Some(dialog) = self.file_dialog.as_mut() {
                    dialog.draw(frame, area)?;
                }
            }
            Modal::Connection => {
                if let Some(dialog) = self.connection_dialog.as_mut() {
                    dialog.draw(frame, area)?;
                }
            }
            Modal::ScriptEditor { .. } => {
                if let Some(editor) = self.script_editor.as_mut() {
                    editor.draw(frame, area)?;
                }
            }
            Modal::Loading => {
                if let Some(dialog) = self.loading.as_mut() {
                    dialog.draw(frame, area)?;
                }
            }
            Modal::ClearTableConfirm { .. } => {
                if let Some(dialog) = self.clear_dialog.as_mut() {
                    dialog.draw(frame, area)?;
                }
            }
            Modal::ConnectionError => self.draw_connection_error(frame, area),
        }
        Ok(())
    }

    fn draw_connection_error(&self, frame: &mut Frame, area: Rect) {
        let message = self.last_connection_error.as_deref().unwrap_or_default();
        let popup_area = centered_popup(area, 70.min(area.width), 12);
        frame.render_widget(Clear, popup_area);

        let content = vec![
            Line::from(Span::styled(
                self.connection.describe(),
                Style::default().fg(Color::DarkGray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(Color::White),
            )),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    " Esc ",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("Close"),
            ]),
        ];

        let paragraph = Paragraph::new(content)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Connection Error ")
                    .title_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, popup_area);
    }

    fn render_title_bar(&self, frame: &mut Frame, area: Rect) {
        let spans = vec![
            Span::styled(
                format!(" {} ", self.settings.app_name),
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" v{} ", env!("CARGO_PKG_VERSION")),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!(" {} ", self.save_file_name),
                Style::default().fg(Color::Yellow),
            ),
        ];
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![];

        let connecting = matches!(self.job_runner.current(), Some(JobKind::Connect { .. }))
            && !self.testing_connection;
        let (badge, color) = if self.query_runner.is_connected() {
            (" ● DB ", Color::Green)
        } else if connecting {
            (" ◌ DB ", Color::Yellow)
        } else {
            (" ○ DB ", Color::Red)
        };
        spans.push(Span::styled(
            badge,
            Style::default()
                .fg(Color::Black)
                .bg(color)
                .add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));

        match self.notifications.current() {
            Some(notification) => {
                let color = match notification.level {
                    Level::Info => Color::Green,
                    Level::Warning => Color::Yellow,
                    Level::Error => Color::Red,
                };
                spans.push(Span::styled(
                    notification.display(),
                    Style::default().fg(color),
                ));
            }
            None => {
                let message = if connecting {
                    format!("Connecting to {}…", self.connection.describe())
                } else {
                    self.query_runner.status().message.clone()
                };
                spans.push(Span::styled(message, Style::default().fg(Color::DarkGray)));
            }
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_help_bar(&self, frame: &mut Frame, area: Rect) {
        let hints: &[(&str, &str, Color)] = if self.form.is_editing() {
            &[
                (" Enter ", "Commit  ", Color::Green),
                (" Esc ", "Cancel", Color::Yellow),
            ]
        } else if self.form.in_table() {
            &[
                (" hjkl ", "Move  ", Color::Cyan),
                (" Enter ", "Edit  ", Color::Green),
                (" a ", "Add  ", Color::Green),
                (" x ", "Delete  ", Color::Red),
                (" C ", "Clear  ", Color::Red),
                (" Esc ", "Back", Color::Yellow),
            ]
        } else {
            &[
                (" q ", "Quit  ", Color::Yellow),
                (" ? ", "Help  ", Color::Yellow),
                (" Tab ", "Page  ", Color::Cyan),
                (" Enter ", "Edit  ", Color::Green),
                (" s ", "Save  ", Color::Green),
                (" o ", "Open  ", Color::Green),
                (" v ", "JSON  ", Color::Cyan),
                (" c ", "Connection  ", Color::Magenta),
                (" e ", "Script  ", Color::Magenta),
                (" r ", "Run", Color::Magenta),
            ]
        };

        let spans: Vec<Span> = hints
            .iter()
            .flat_map(|(key, label, color)| {
                [
                    Span::styled(
                        *key,
                        Style::default().fg(*color).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(*label),
                ]
            })
            .collect();

        let paragraph = Paragraph::new(Line::from(spans))
            .alignment(Alignment::Left)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::query_runner::tests::FakeConnector;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const FIELDS: &str = r#"{
        "object_name": {"type": "text", "name": "Object"},
        "dag_owner": {"type": "text", "name": "Owner"},
        "load": {"type": "select", "name": "Load", "values": ["full", "delta"]},
        "fields": {"type": "table", "name": "Fields", "values": [
            {"key": "name", "name": "Name", "type": "text"},
            {"key": "active", "name": "Active", "type": "boolean"}
        ]}
    }"#;

    const MIXED_FIELDS: &str = r#"{
        "object_name": {"type": "text", "name": "Object"},
        "columns": {"type": "table", "name": "Columns", "values": [
            {"key": "name", "name": "Name", "type": "text"},
            {"key": "kind", "name": "Kind", "type": "select", "values": ["table", "view"]},
            {"key": "width", "name": "Width", "type": "number"},
            {"key": "nullable", "name": "Null", "type": "boolean"}
        ]}
    }"#;

    fn app_in(dir: &Path, accept: bool) -> App {
        app_with_fields(dir, FIELDS, accept)
    }

    fn app_with_fields(dir: &Path, fields: &str, accept: bool) -> App {
        let paths = Paths::new(dir);
        fs::create_dir_all(paths.config_dir()).unwrap();
        fs::write(paths.fields_file(), fields).unwrap();
        fs::write(
            paths.scripts_file(),
            r#"{"object_name": "select '{{ value }}' as name"}"#,
        )
        .unwrap();
        let runner = QueryRunner::new(Arc::new(FakeConnector { accept }));
        App::with_runner(paths, Settings::default(), runner).unwrap()
    }

    /// Tick until the background job reports, feeding follow-ups back in
    fn settle(app: &mut App) {
        for _ in 0..200 {
            let mut next = app.update(Action::Tick).unwrap();
            let done = !app.job_runner.is_busy();
            while let Some(action) = next {
                next = app.update(action).unwrap();
            }
            if done {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("job did not finish");
    }

    fn dispatch(app: &mut App, action: Action) {
        let mut next = Some(action);
        while let Some(action) = next {
            next = app.update(action).unwrap();
        }
    }

    fn press(app: &mut App, code: KeyCode) {
        let next = app
            .handle_key_event(KeyEvent::new(code, KeyModifiers::NONE))
            .unwrap();
        if let Some(action) = next {
            dispatch(app, action);
        }
    }

    #[test]
    fn test_startup_seeds_output_and_hooks() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), true);
        settle(&mut app);

        assert!(app.query_runner.is_connected());
        assert_eq!(app.output.get("load"), Some(&json!("full")));
        assert_eq!(app.output.get("fields"), Some(&json!([])));
        assert_eq!(app.output.get_text("dag_owner"), os_user_name());
    }

    #[test]
    fn test_object_name_sets_save_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), false);
        dispatch(
            &mut app,
            Action::FieldChanged(FieldChange::new("object_name", json!("dim_orders"))),
        );
        assert_eq!(app.save_file_name, "dim_orders.json");
    }

    #[test]
    fn test_undeclared_change_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), false);
        let result = app.update(Action::FieldChanged(FieldChange::new("ghost", json!(1))));
        assert!(result.is_err());
    }

    #[test]
    fn test_run_script_fills_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), true);
        settle(&mut app);

        dispatch(&mut app, Action::BeginEdit);
        for c in "orders".chars() {
            dispatch(&mut app, Action::EditInput(c));
        }
        dispatch(&mut app, Action::CommitEdit);
        dispatch(&mut app, Action::RunScript);
        assert!(app.modals.contains(&Modal::Loading));
        settle(&mut app);

        assert!(app.modals.is_empty());
        assert_eq!(
            app.output.get("fields"),
            Some(&json!([{"name": "select 'orders' as name", "active": 1}]))
        );
    }

    #[test]
    fn test_editor_runs_unsaved_text() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), true);
        settle(&mut app);
        let scripts = app.scripts.clone();

        dispatch(&mut app, Action::OpenScriptEditor);
        assert!(matches!(app.modals.top(), Some(Modal::ScriptEditor { .. })));
        press(&mut app, KeyCode::End);
        for c in " limit 1".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        let run = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(app.handle_key_event(run).unwrap(), Some(Action::RunEditorScript));
        dispatch(&mut app, Action::RunEditorScript);
        assert!(app.modals.contains(&Modal::Loading));
        settle(&mut app);

        assert_eq!(
            app.output.get("fields"),
            Some(&json!([{"name": "select '' as name limit 1", "active": 1}]))
        );
        assert_eq!(app.scripts, scripts);
        assert!(matches!(app.modals.top(), Some(Modal::ScriptEditor { .. })));
    }

    #[test]
    fn test_connect_waits_for_running_job() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), true);
        assert!(app.job_runner.is_busy());
        let host = app.connection.host.clone();
        let other = format!("{}-other", host);

        dispatch(&mut app, Action::OpenConnectionDialog);
        press(&mut app, KeyCode::End);
        for c in "-other".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.modals.top(), Some(&Modal::Connection));
        assert_eq!(app.connection.host, host);

        settle(&mut app);
        let message = app.notifications.current().unwrap().message.clone();
        assert!(message.contains(&format!("@{}:", host)), "{}", message);

        press(&mut app, KeyCode::Enter);
        assert!(app.connection_dialog.is_none());
        assert_eq!(app.connection.host, other);
        settle(&mut app);
        let message = app.notifications.current().unwrap().message.clone();
        assert!(message.contains(&format!("@{}:", other)), "{}", message);
    }

    #[test]
    fn test_run_script_requires_connection() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), false);
        settle(&mut app);

        assert!(!app.query_runner.is_connected());
        dispatch(&mut app, Action::RunScript);
        assert!(!app.job_runner.is_busy());
        assert_eq!(app.notifications.current().unwrap().level, Level::Error);

        dispatch(&mut app, Action::ShowConnectionError);
        assert_eq!(app.modals.top(), Some(&Modal::ConnectionError));
    }

    #[test]
    fn test_save_then_load_restores_output() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), false);
        dispatch(
            &mut app,
            Action::FieldChanged(FieldChange::new("object_name", json!("stg_users"))),
        );
        dispatch(&mut app, Action::OpenSaveDialog);
        dispatch(&mut app, Action::SaveOutput("snapshot.json".to_string()));
        assert!(app.modals.is_empty());
        assert!(dir.path().join("save_config/snapshot.json").exists());
        let saved = app.output.clone();

        dispatch(
            &mut app,
            Action::FieldChanged(FieldChange::new("object_name", json!("other"))),
        );
        dispatch(&mut app, Action::LoadOutput("snapshot.json".to_string()));
        assert_eq!(app.output, saved);
        assert_eq!(app.save_file_name, "snapshot.json");
    }

    #[test]
    fn test_mixed_table_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_fields(dir.path(), MIXED_FIELDS, false);
        let rows: Vec<Map<String, Value>> = serde_json::from_value(json!([
            {"name": "id", "kind": "view", "width": 12, "nullable": 0},
            {"name": "label", "kind": "table", "width": -3, "nullable": 1}
        ]))
        .unwrap();
        let change = app.form.populate_table("columns", &rows).unwrap();
        dispatch(&mut app, Action::FieldChanged(change));
        dispatch(
            &mut app,
            Action::FieldChanged(FieldChange::new("object_name", json!("dim_columns"))),
        );
        let table = app.output.get("columns").cloned().unwrap();
        assert_eq!(table, json!(rows));

        dispatch(&mut app, Action::SaveOutput("mixed.json".to_string()));
        let saved = app.output.clone();

        dispatch(&mut app, Action::FocusTable);
        dispatch(&mut app, Action::OpenClearTable);
        dispatch(&mut app, Action::ClearTable);
        dispatch(
            &mut app,
            Action::FieldChanged(FieldChange::new("object_name", json!("other"))),
        );
        assert_eq!(app.output.get("columns"), Some(&json!([])));

        dispatch(&mut app, Action::LoadOutput("mixed.json".to_string()));
        assert_eq!(app.output, saved);
        assert_eq!(app.form.table_mut("columns").unwrap().value(), table);
        assert_eq!(app.output.get_text("object_name"), "dim_columns");
    }

    #[test]
    fn test_clear_table_needs_confirmation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path(), false);
        dispatch(&mut app, Action::FocusTable);
        dispatch(&mut app, Action::AddRow);
        assert_eq!(app.output.get("fields").unwrap().as_array().unwrap().len(), 1);

        dispatch(&mut app, Action::OpenClearTable);
        assert!(matches!(app.modals.top(), Some(Modal::ClearTableConfirm { .. })));
        dispatch(&mut app, Action::ClearTable);
        assert!(app.modals.is_empty());
        assert_eq!(app.output.get("fields"), Some(&json!([])));
    }

    #[test]
    fn test_empty_config_starts_from_template() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path());
        let runner = QueryRunner::new(Arc::new(FakeConnector { accept: false }));
        let app = App::with_runner(paths, Settings::default(), runner).unwrap();
        assert!(app.output.declares("fields"));
    }
}
