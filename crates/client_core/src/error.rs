use shared::{domain::ItemId, error::DraftError};
use thiserror::Error;

/// Failures raised by item stores and surfaced by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Bad user input; never reaches a backend.
    #[error("{0}")]
    Validation(String),
    #[error("backend not ready: {0}")]
    Initialization(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("backend write failed: {0}")]
    BackendWrite(String),
    #[error("live channel failed: {0}")]
    BackendSubscription(String),
    /// Mutation target absent. Benign; not shown to users.
    #[error("item {0} not found")]
    NotFound(ItemId),
}

impl From<DraftError> for StoreError {
    fn from(value: DraftError) -> Self {
        Self::Validation(value.to_string())
    }
}
