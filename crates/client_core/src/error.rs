use shared::domain::ItemId;
use thiserror::Error;

/// Failures surfaced by [`crate::OptimisticItemStore`].
///
/// Every variant has already been logged and broadcast by the time the caller
/// sees it.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to fetch items: {source}")]
    Fetch { source: anyhow::Error },
    #[error("failed to create item '{name}': {source}")]
    Create { name: String, source: anyhow::Error },
    #[error("unknown item {id}")]
    NotFound { id: ItemId },
    #[error("failed to update item {id}: {source}")]
    Update { id: ItemId, source: anyhow::Error },
}

impl StoreError {
    /// Remote failures leave local and remote state possibly diverged.
    pub fn is_remote(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}
