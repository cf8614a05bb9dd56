//! Task storage errors.

use doc2md_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("corrupt task record: {0}")]
    Corrupt(#[from] serde_json::Error),
}
