use shared::domain::Item;

use crate::{reconcile::aggregates, store::BackendMode};

pub const EMPTY_LIST_MESSAGE: &str = "The list is empty! Add the first item.";
pub const VALIDATION_MESSAGE: &str = "Please enter a valid name and a quantity greater than 0.";
pub const NOT_READY_MESSAGE: &str = "Wait for the initial authentication to finish.";
pub const TOGGLE_FAILED_MESSAGE: &str = "Could not update the item. Try again.";
pub const INITIALIZING_MESSAGE: &str = "Initializing...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub severity: Severity,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Info,
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Warning,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Error,
        }
    }
}

/// Status line for the current list.
///
/// A transient message wins, then the local-mode summary, then the empty-list
/// prompt, then the regular summary.
pub fn derive_status(items: &[Item], transient: Option<&str>, mode: BackendMode) -> Status {
    if let Some(message) = transient {
        return Status::info(message);
    }
    let counts = aggregates(items);
    if mode == BackendMode::Local {
        return Status::info(format!(
            "Local mode: {} of {} items purchased.",
            counts.purchased_count, counts.total
        ));
    }
    if counts.total == 0 {
        return Status::warning(EMPTY_LIST_MESSAGE);
    }
    Status::info(format!(
        "List OK: {} of {} items purchased.",
        counts.purchased_count, counts.total
    ))
}

/// Like [`derive_status`], except that a failed live channel overrides
/// everything else.
pub fn derive_status_with_connection(
    items: &[Item],
    transient: Option<&str>,
    mode: BackendMode,
    connection_error: Option<&str>,
) -> Status {
    match connection_error {
        Some(message) => Status::error(format!("Fatal connection error: {message}")),
        None => derive_status(items, transient, mode),
    }
}

pub fn adding_message() -> String {
    "Adding item...".to_string()
}

pub fn added_message(name: &str) -> String {
    format!("Item '{name}' added successfully!")
}

pub fn deleting_message(name: &str) -> String {
    format!("Deleting '{name}'...")
}

pub fn deleted_message(name: &str) -> String {
    format!("Item '{name}' deleted.")
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
