//! Modal stack for managing overlays
//!
//! Only the top modal receives input; modals are drawn bottom to top.

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    QuitConfirm,
    Help,
    /// Pretty-printed output model
    JsonView,
    /// Path prompt for saving the output
    SaveAs,
    /// Path prompt for loading a saved output
    LoadFrom,
    /// Connection settings form
    Connection,
    /// Script editor for the given field key
    ScriptEditor { key: String },
    /// Shown while a connect or query job runs
    Loading,
    ClearTableConfirm { key: String },
    /// Last connection failure message
    ConnectionError,
}

#[derive(Debug, Default)]
pub struct ModalStack {
    stack: Vec<Modal>,
}

impl ModalStack {
    pub fn new() -> Self {
        Self { stack: Vec::new() }
    }

    pub fn push(&mut self, modal: Modal) {
        self.stack.push(modal);
    }

    pub fn pop(&mut self) -> Option<Modal> {
        self.stack.pop()
    }

    pub fn top(&self) -> Option<&Modal> {
        self.stack.last()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn contains(&self, modal: &Modal) -> bool {
        self.stack.contains(modal)
    }

    /// Remove every instance of a modal wherever it sits in the stack
    pub fn remove(&mut self, modal: &Modal) {
        self.stack.retain(|m| m != modal);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Modal> {
        self.stack.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modal_stack_push_pop() {
        let mut stack = ModalStack::new();
        assert!(stack.top().is_none());

        stack.push(Modal::QuitConfirm);
        stack.push(Modal::JsonView);
        assert_eq!(stack.pop(), Some(Modal::JsonView));
        assert_eq!(stack.pop(), Some(Modal::QuitConfirm));
        assert!(stack.is_empty());
    }

    #[test]
    fn test_remove_buried_modal() {
        let mut stack = ModalStack::new();
        stack.push(Modal::ScriptEditor {
            key: "object_name".to_string(),
        });
        stack.push(Modal::Loading);
        stack.push(Modal::Help);

        stack.remove(&Modal::Loading);
        assert!(!stack.contains(&Modal::Loading));
        assert_eq!(stack.top(), Some(&Modal::Help));
        assert_eq!(stack.iter().count(), 2);
    }
}
