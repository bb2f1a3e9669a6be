use thiserror::Error;

use crate::storage::{PageId, StorageError};

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("page {0} is not resident in the pool")]
    PageNotInPool(PageId),

    #[error("no free frame: all {0} frames are pinned")]
    NoFreeFrame(usize),

    #[error("{0} page(s) still pinned at shutdown")]
    PinnedPages(usize),

    #[error("buffer pool needs at least one frame")]
    InvalidFrameCount,
}

pub type PoolResult<T> = Result<T, PoolError>;
