//! Notifications shown in the status bar

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

const MAX_KEPT: usize = 50;
/// Info messages fade from the status bar after this long
const INFO_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub created: Instant,
    /// Wall-clock time for display
    pub at: DateTime<Local>,
}

impl Notification {
    /// `[HH:MM:SS] message`
    pub fn display(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.message)
    }
}

#[derive(Debug, Default)]
pub struct NotificationStack {
    items: Vec<Notification>,
}

impl NotificationStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, level: Level, message: impl Into<String>) {
        self.items.push(Notification {
            level,
            message: message.into(),
            created: Instant::now(),
            at: Local::now(),
        });
        if self.items.len() > MAX_KEPT {
            let excess = self.items.len() - MAX_KEPT;
            self.items.drain(..excess);
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Level::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(Level::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Level::Error, message);
    }

    /// The newest notification that should still be on screen
    pub fn current(&self) -> Option<&Notification> {
        self.items
            .last()
            .filter(|n| n.level != Level::Info || n.created.elapsed() < INFO_TTL)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_wins() {
        let mut stack = NotificationStack::new();
        stack.info("saved");
        stack.error("query failed");
        let current = stack.current().unwrap();
        assert_eq!(current.level, Level::Error);
        assert_eq!(current.message, "query failed");
        assert!(current.display().ends_with("] query failed"));
        assert!(current.display().starts_with('['));
    }

    #[test]
    fn test_history_is_capped() {
        let mut stack = NotificationStack::new();
        for i in 0..(MAX_KEPT + 10) {
            stack.warn(format!("w{}", i));
        }
        assert_eq!(stack.len(), MAX_KEPT);
        assert_eq!(stack.current().unwrap().message, format!("w{}", MAX_KEPT + 9));
    }
}
