pub mod lock;
pub mod portfolio_store;

pub use lock::StoreLock;
pub use portfolio_store::PortfolioStore;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("portfolio file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("portfolio serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("portfolio is locked by another running process ({0})")]
    Locked(PathBuf),
}
