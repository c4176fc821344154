//! Action enum - All possible application actions
//!
//! Components turn key events into Actions; the App processes them and may
//! answer with a follow-up Action, which the main loop feeds straight back in.

use crate::model::output::FieldChange;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // ─────────────────────────────────────────────────────────────────────────
    // App Lifecycle
    // ─────────────────────────────────────────────────────────────────────────
    /// Regular tick; background jobs are polled here
    Tick,
    /// Terminal was resized
    Resize(u16, u16),
    /// Quit without confirmation
    ForceQuit,

    // ─────────────────────────────────────────────────────────────────────────
    // Form Navigation
    // ─────────────────────────────────────────────────────────────────────────
    NextPage,
    PrevPage,
    NextField,
    PrevField,

    // ─────────────────────────────────────────────────────────────────────────
    // Field Editing
    // ─────────────────────────────────────────────────────────────────────────
    /// Start editing the focused field or table cell
    BeginEdit,
    CommitEdit,
    CancelEdit,
    EditInput(char),
    EditBackspace,
    EditDelete,
    EditLeft,
    EditRight,
    EditHome,
    EditEnd,
    /// Flip a checkbox, or step a select forward
    ToggleField,
    /// Step a select or number field, or move the tag cursor
    StepField(i64),
    RemoveTag,
    /// A control emitted a new value for its key
    FieldChanged(FieldChange),

    // ─────────────────────────────────────────────────────────────────────────
    // Table
    // ─────────────────────────────────────────────────────────────────────────
    FocusTable,
    LeaveTable,
    TableMove(isize, isize),
    AddRow,
    DeleteRow,
    /// Ask before emptying the table
    OpenClearTable,
    ClearTable,

    // ─────────────────────────────────────────────────────────────────────────
    // Modals
    // ─────────────────────────────────────────────────────────────────────────
    OpenQuitDialog,
    OpenHelp,
    OpenJsonView,
    OpenSaveDialog,
    OpenLoadDialog,
    OpenConnectionDialog,
    OpenScriptEditor,
    ShowConnectionError,
    /// Close the current modal
    CloseModal,

    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────
    SaveOutput(String),
    LoadOutput(String),
    SaveScript(String),

    // ─────────────────────────────────────────────────────────────────────────
    // Database
    // ─────────────────────────────────────────────────────────────────────────
    /// Connect with the settings in the connection dialog
    TestConnection,
    SaveConnection,
    Connect,
    /// Run the focused field's saved script
    RunScript,
    /// Run the script editor's current text, saved or not
    RunEditorScript,
    CancelQuery,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Resize(w, h) => write!(f, "Resize({}, {})", w, h),
            Action::EditInput(c) => write!(f, "EditInput('{}')", c),
            Action::StepField(delta) => write!(f, "StepField({})", delta),
            Action::FieldChanged(change) => write!(f, "FieldChanged({})", change.key),
            Action::TableMove(r, c) => write!(f, "TableMove({}, {})", r, c),
            Action::SaveOutput(path) => write!(f, "SaveOutput({})", path),
            Action::LoadOutput(path) => write!(f, "LoadOutput({})", path),
            Action::SaveScript(key) => write!(f, "SaveScript({})", key),
            other => write!(f, "{:?}", other),
        }
    }
}
