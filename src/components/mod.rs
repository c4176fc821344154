//! UI Components
//!
//! Each component encapsulates its own state, event handling, and rendering logic.
//! Components communicate through Actions rather than direct state mutation.

pub mod confirm_dialog;
pub mod connection_dialog;
pub mod file_dialog;
pub mod form;
pub mod help_dialog;
pub mod json_view_dialog;
pub mod layout;
pub mod loading_dialog;
pub mod script_editor;
pub mod scroll_view;
pub mod sql_highlight;
pub mod table;
pub mod text_input;

pub use confirm_dialog::ConfirmDialog;
pub use connection_dialog::ConnectionDialog;
pub use file_dialog::{FileDialog, FileMode};
pub use form::FormComponent;
pub use help_dialog::HelpDialog;
pub use json_view_dialog::JsonViewDialog;
pub use layout::{calculate_main_layout, centered_popup};
pub use loading_dialog::LoadingDialog;
pub use script_editor::ScriptEditor;
