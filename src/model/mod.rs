//! Model layer - centralized state management
//!
//! - `FieldSchema` / `PagesDocument` - what the form shows
//! - `OutputModel` - the configuration being built
//! - `FieldControl` / `TableModel` - live control state
//! - `ModalStack` / `NotificationStack` - overlay and status state

pub mod connection;
pub mod field;
pub mod hooks;
pub mod job;
pub mod modal;
pub mod notification;
pub mod output;
pub mod schema;
pub mod table;
