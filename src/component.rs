//! Component trait - Interface for UI components
//!
//! Components own their local state, turn key events into Actions and
//! render themselves. Shared state lives in the App and only changes in
//! `App::update`.

use crate::action::Action;
use anyhow::Result;
use crossterm::event::KeyEvent;
use ratatui::{layout::Rect, Frame};

/// Trait for UI components
///
/// 1. `handle_key_event` - map a key to an Action (local cursor or text
///    state may change here)
/// 2. `update` - react to an Action, optionally returning a follow-up
/// 3. `draw` - render into `area`
pub trait Component {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        let _ = key;
        Ok(None)
    }

    /// A returned Action is fed straight back into the App by the main loop
    fn update(&mut self, action: Action) -> Result<Option<Action>> {
        let _ = action;
        Ok(None)
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect) -> Result<()>;
}
