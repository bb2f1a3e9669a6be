pub mod buffer;
pub mod record;
pub mod storage;

pub use buffer::{BufferPool, PageHandle, PoolError, PoolResult, ReplacementStrategy};
pub use record::{
    Attribute, CmpOp, DataType, Expr, Record, RecordError, RecordResult, Rid, Schema, Table,
    TableScan, Value,
};
pub use storage::{PAGE_SIZE, PageFile, PageId, StorageError, StorageResult};

/// Terminal logger for binaries and examples. Library types never install a
/// global logger; they take a `slog::Logger` and derive children from it.
pub fn default_logger() -> slog::Logger {
    use slog::Drain;

    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, slog::o!())
}
