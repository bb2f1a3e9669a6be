use std::path::Path;

use slog::{Logger, debug, o, trace};

use super::error::{RecordError, RecordResult};
use super::expr::Expr;
use super::record::{Record, Rid};
use super::schema::Schema;
use super::value::Value;
use crate::buffer::{BufferPool, PageHandle, ReplacementStrategy};
use crate::storage::{PAGE_SIZE, PageFile, PageId};

/// Occupancy marker of a live slot
pub(crate) const MARKER_LIVE: u8 = b'#';
/// Occupancy marker of a tombstoned slot
pub(crate) const MARKER_DEAD: u8 = b'$';

/// Frames in the dedicated pool each open table gets
const TABLE_POOL_FRAMES: usize = 10;

/// An open table file.
///
/// Page 0 holds the schema header; pages 1… hold fixed-size slots of
/// `record_size + 1` bytes each, the first byte being the occupancy marker.
/// Every open table owns a dedicated ten-frame LRU buffer pool over its
/// file.
pub struct Table {
    pool: BufferPool,
    schema: Schema,
    num_tuples: usize,
    /// Hint: lowest page that may contain a free slot. Insertion scans
    /// forward from here and moves it to the page that satisfied the
    /// allocation.
    first_free_page: PageId,
    logger: Logger,
}

impl Table {
    /// Create a table file at `path` and write its schema header.
    pub fn create<P: AsRef<Path>>(path: P, schema: &Schema) -> RecordResult<()> {
        PageFile::create(&path)?;
        let mut file = PageFile::open(&path)?;

        let mut header = vec![0u8; PAGE_SIZE];
        schema.encode_header(0, 1, &mut header);
        file.write_block(0, &header)?;
        file.sync()?;
        Ok(())
    }

    /// Open an existing table, reading the schema snapshot from page 0.
    pub fn open<P: AsRef<Path>>(path: P, logger: &Logger) -> RecordResult<Self> {
        let logger = logger.new(o!("table" => path.as_ref().display().to_string()));

        let mut pool =
            BufferPool::new(&path, TABLE_POOL_FRAMES, ReplacementStrategy::Lru, &logger)?;

        let handle = pool.pin(0)?;
        let decoded = Schema::decode_header(pool.data(&handle)?);
        pool.unpin(handle)?;
        let (schema, num_tuples, first_free_page) = decoded?;

        if first_free_page == 0 {
            return Err(RecordError::BadHeader(
                "first free page points at the header".to_string(),
            ));
        }

        debug!(logger, "table opened"; "tuples" => num_tuples);
        Ok(Self {
            pool,
            schema,
            num_tuples: num_tuples as usize,
            first_free_page: first_free_page as PageId,
            logger,
        })
    }

    /// Write the current tuple count back to the header, flush, and shut the
    /// pool down.
    pub fn close(mut self) -> RecordResult<()> {
        let handle = self.pool.pin(0)?;
        {
            let num_tuples = self.num_tuples as u32;
            let first_free_page = self.first_free_page as u32;
            let data = self.pool.data_mut(&handle)?;
            self.schema.encode_header(num_tuples, first_free_page, data);
        }
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(handle)?;
        self.pool.shutdown()?;

        debug!(self.logger, "table closed"; "tuples" => self.num_tuples);
        Ok(())
    }

    /// Remove a table file from disk.
    pub fn destroy<P: AsRef<Path>>(path: P) -> RecordResult<()> {
        PageFile::destroy(path)?;
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Cached count of live records
    pub fn num_tuples(&self) -> usize {
        self.num_tuples
    }

    /// Record payload size in bytes
    pub fn record_size(&self) -> usize {
        self.schema.record_size()
    }

    /// Slots per data page for this table's record size
    pub fn slots_per_page(&self) -> usize {
        PAGE_SIZE / (self.schema.record_size() + 1)
    }

    /// Read-only view of the table's buffer pool
    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Store a record in the first free slot at or after the free-page
    /// hint, growing the file when every existing page is full.
    pub fn insert(&mut self, record: &Record) -> RecordResult<Rid> {
        let record_size = self.schema.record_size();
        if record.data.len() != record_size {
            return Err(RecordError::WrongRecordSize {
                expected: record_size,
                actual: record.data.len(),
            });
        }

        let slot_size = record_size + 1;
        let slots = self.slots_per_page();
        let mut page = self.first_free_page.max(1);

        loop {
            let handle = self.pool.pin(page)?;
            let free = {
                let data = self.pool.data(&handle)?;
                (0..slots).find(|&slot| data[slot * slot_size] != MARKER_LIVE)
            };

            let Some(slot) = free else {
                self.pool.unpin(handle)?;
                page += 1;
                continue;
            };

            let offset = slot * slot_size;
            let data = self.pool.data_mut(&handle)?;
            data[offset] = MARKER_LIVE;
            data[offset + 1..offset + slot_size].copy_from_slice(&record.data);
            self.pool.mark_dirty(&handle)?;
            self.pool.unpin(handle)?;

            self.first_free_page = page;
            self.num_tuples += 1;
            trace!(self.logger, "record inserted"; "page" => page, "slot" => slot);
            return Ok(Rid::new(page, slot));
        }
    }

    /// Read the record at `rid`.
    pub fn get(&mut self, rid: Rid) -> RecordResult<Record> {
        let offset = self.slot_offset(rid)?;
        let record_size = self.schema.record_size();

        let handle = self.pool.pin(rid.page)?;
        let data = self.pool.data(&handle)?;
        if data[offset] != MARKER_LIVE {
            self.pool.unpin(handle)?;
            return Err(RecordError::NoSuchTuple(rid));
        }
        let payload = data[offset + 1..offset + 1 + record_size].to_vec();
        self.pool.unpin(handle)?;

        Ok(Record {
            id: Some(rid),
            data: payload,
        })
    }

    /// Tombstone the record at `rid`. Deleting a slot that is not live is
    /// rejected.
    pub fn delete(&mut self, rid: Rid) -> RecordResult<()> {
        let offset = self.slot_offset(rid)?;

        let handle = self.pool.pin(rid.page)?;
        let data = self.pool.data_mut(&handle)?;
        if data[offset] != MARKER_LIVE {
            self.pool.unpin(handle)?;
            return Err(RecordError::NoSuchTuple(rid));
        }
        data[offset] = MARKER_DEAD;
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(handle)?;

        self.num_tuples -= 1;
        // Keep the hint a lower bound on the first page with a free slot
        if rid.page < self.first_free_page {
            self.first_free_page = rid.page;
        }
        trace!(self.logger, "record deleted"; "page" => rid.page, "slot" => rid.slot);
        Ok(())
    }

    /// Overwrite the payload of the record at `record.id`, keeping the
    /// occupancy marker. Updating a slot that is not live is rejected.
    pub fn update(&mut self, record: &Record) -> RecordResult<()> {
        let rid = record.id.ok_or(RecordError::MissingRid)?;
        let offset = self.slot_offset(rid)?;

        let record_size = self.schema.record_size();
        if record.data.len() != record_size {
            return Err(RecordError::WrongRecordSize {
                expected: record_size,
                actual: record.data.len(),
            });
        }

        let handle = self.pool.pin(rid.page)?;
        let data = self.pool.data_mut(&handle)?;
        if data[offset] != MARKER_LIVE {
            self.pool.unpin(handle)?;
            return Err(RecordError::NoSuchTuple(rid));
        }
        data[offset + 1..offset + 1 + record_size].copy_from_slice(&record.data);
        self.pool.mark_dirty(&handle)?;
        self.pool.unpin(handle)?;
        Ok(())
    }

    /// Start a sequential scan over the live records, optionally filtered by
    /// a predicate.
    pub fn scan(&mut self, predicate: Option<Expr>) -> TableScan<'_> {
        let target = self.num_tuples;
        TableScan {
            table: self,
            next_page: 1,
            next_slot: 0,
            seen: 0,
            target,
            predicate,
            done: false,
        }
    }

    fn slot_offset(&self, rid: Rid) -> RecordResult<usize> {
        let slots = self.slots_per_page();
        if rid.slot >= slots {
            return Err(RecordError::InvalidSlot {
                slot: rid.slot,
                slots_per_page: slots,
            });
        }
        if rid.page == 0 {
            return Err(RecordError::NoSuchTuple(rid));
        }
        Ok(rid.slot * (self.schema.record_size() + 1))
    }
}

/// Cursor over a table's live records.
///
/// Advances `(page, slot)` in row-major order from `(1, 0)`, pinning one
/// page at a time and unpinning it before returning, so no frame is held
/// between calls. The scan sees a best-effort view: slots already passed are
/// not revisited.
pub struct TableScan<'t> {
    table: &'t mut Table,
    next_page: PageId,
    next_slot: usize,
    /// Live slots examined so far
    seen: usize,
    /// Live-record count captured at scan start
    target: usize,
    predicate: Option<Expr>,
    done: bool,
}

impl TableScan<'_> {
    /// Fetch the next matching record; `Ok(None)` once the table is
    /// exhausted. A predicate that does not produce a boolean ends the scan
    /// with `TypeMismatch`.
    pub fn next_record(&mut self) -> RecordResult<Option<Record>> {
        while !self.done {
            if self.seen >= self.target || self.next_page >= self.table.pool.total_pages() {
                self.done = true;
                break;
            }

            let page = self.next_page;
            let handle = self.table.pool.pin(page)?;
            let swept = self.sweep(&handle, page);
            let unpinned = self.table.pool.unpin(handle);
            let found = swept?;
            unpinned?;

            if self.next_slot >= self.table.slots_per_page() {
                self.next_page += 1;
                self.next_slot = 0;
            }

            let Some(record) = found else { continue };
            let Some(predicate) = &self.predicate else {
                return Ok(Some(record));
            };

            match predicate.eval(&record, &self.table.schema) {
                Ok(Value::Bool(true)) => return Ok(Some(record)),
                Ok(Value::Bool(false)) => continue,
                Ok(other) => {
                    self.done = true;
                    return Err(RecordError::TypeMismatch {
                        expected: "BOOL".to_string(),
                        actual: other.type_name().to_string(),
                    });
                }
                Err(e) => {
                    self.done = true;
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    /// Terminate the scan. No frame outlives a `next_record` call, so this
    /// only consumes the cursor.
    pub fn close(self) {}

    /// Advance through the pinned page until a live slot or the page ends.
    fn sweep(&mut self, handle: &PageHandle, page: PageId) -> RecordResult<Option<Record>> {
        let record_size = self.table.schema.record_size();
        let slot_size = record_size + 1;
        let slots = self.table.slots_per_page();

        let data = self.table.pool.data(handle)?;
        while self.next_slot < slots && self.seen < self.target {
            let slot = self.next_slot;
            self.next_slot += 1;

            let offset = slot * slot_size;
            if data[offset] != MARKER_LIVE {
                continue;
            }
            self.seen += 1;
            return Ok(Some(Record {
                id: Some(Rid::new(page, slot)),
                data: data[offset + 1..offset + 1 + record_size].to_vec(),
            }));
        }
        Ok(None)
    }
}

impl Iterator for TableScan<'_> {
    type Item = RecordResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
