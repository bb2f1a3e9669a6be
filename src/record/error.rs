use thiserror::Error;

use super::record::Rid;
use crate::buffer::PoolError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("buffer pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no tuple at {0}")]
    NoSuchTuple(Rid),

    #[error("slot {slot} out of range: data pages hold {slots_per_page} slots")]
    InvalidSlot { slot: usize, slots_per_page: usize },

    #[error("record carries no id")]
    MissingRid,

    #[error("payload is {actual} bytes, records of this table are {expected}")]
    WrongRecordSize { expected: usize, actual: usize },

    #[error("{actual} values for {expected} attributes")]
    WrongValueCount { expected: usize, actual: usize },

    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("attribute index {index} out of range ({count} attributes)")]
    AttrOutOfRange { index: usize, count: usize },

    #[error("text of {len} bytes exceeds declared length {max}")]
    TextTooLong { len: usize, max: usize },

    #[error("text values must not contain NUL bytes")]
    TextWithNul,

    #[error("text attribute is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    #[error("attribute name {0:?} is empty, too long, or contains NUL")]
    BadAttrName(String),

    #[error("key index {index} out of range ({count} attributes)")]
    BadKeyIndex { index: usize, count: usize },

    #[error("record size {0} leaves no room for a slot on a page")]
    RecordTooLarge(usize),

    #[error("schema descriptors do not fit the header page")]
    SchemaTooLarge,

    #[error("malformed table header: {0}")]
    BadHeader(String),
}

pub type RecordResult<T> = Result<T, RecordError>;
