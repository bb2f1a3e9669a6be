use std::io;
use thiserror::Error;

use super::PageId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File already exists: {0}")]
    FileExists(String),

    #[error("Non-existing page: {0}")]
    NonExistingPage(PageId),

    #[error("File length {0} is not a multiple of the page size")]
    NotPageAligned(u64),

    #[error("Invalid page buffer length: expected {expected}, got {actual}")]
    BadBufferLength { expected: usize, actual: usize },
}

pub type StorageResult<T> = Result<T, StorageError>;
