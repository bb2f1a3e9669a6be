use std::path::Path;

use slog::{Logger, debug, o, trace};

use super::error::{PoolError, PoolResult};
use crate::storage::{PAGE_SIZE, PageFile, PageId, StorageError};

/// Replacement policy used to pick eviction victims.
///
/// `Lru` and `Fifo` are implemented; the remaining tags are accepted for
/// compatibility and behave as `Lru`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplacementStrategy {
    Fifo,
    Lru,
    LruK,
    Clock,
    Lfu,
}

impl ReplacementStrategy {
    fn effective(self) -> ReplacementStrategy {
        match self {
            ReplacementStrategy::Fifo => ReplacementStrategy::Fifo,
            _ => ReplacementStrategy::Lru,
        }
    }
}

/// Proof that a page is pinned.
///
/// Returned by [`BufferPool::pin`] and consumed by [`BufferPool::unpin`].
/// Page bytes are reached through [`BufferPool::data`] and
/// [`BufferPool::data_mut`], so the frame array stays the sole owner of page
/// memory. The handle is deliberately not `Clone`: one handle per pin.
#[derive(Debug)]
pub struct PageHandle {
    page: PageId,
}

impl PageHandle {
    /// Page number this handle pins
    pub fn page(&self) -> PageId {
        self.page
    }
}

/// One slot of the frame array
struct Frame {
    /// Cached page, `None` while the frame is empty
    page: Option<PageId>,
    data: Box<[u8]>,
    fix_count: u32,
    dirty: bool,
    /// Clock stamp taken on every pin (LRU ordering)
    last_used: u64,
    /// Clock stamp taken when the page was loaded (FIFO ordering)
    loaded_at: u64,
}

impl Frame {
    fn empty() -> Self {
        Self {
            page: None,
            data: vec![0u8; PAGE_SIZE].into_boxed_slice(),
            fix_count: 0,
            dirty: false,
            last_used: 0,
            loaded_at: 0,
        }
    }
}

/// A cache of page frames over one page file, with per-frame fix counts,
/// dirty tracking, and stamp-based victim selection.
///
/// The pool owns its [`PageFile`] exclusively. Frames are allocated once at
/// construction and released at shutdown; a frame with a nonzero fix count is
/// never evicted, and dirty victims are written back before their frame is
/// reused.
pub struct BufferPool {
    file: PageFile,
    frames: Vec<Frame>,
    strategy: ReplacementStrategy,
    /// Monotonic recency clock, bumped on every pin
    clock: u64,
    read_io: u64,
    write_io: u64,
    logger: Logger,
}

impl BufferPool {
    /// Open `path` and build a pool of `num_frames` empty frames over it.
    pub fn new<P: AsRef<Path>>(
        path: P,
        num_frames: usize,
        strategy: ReplacementStrategy,
        logger: &Logger,
    ) -> PoolResult<Self> {
        if num_frames == 0 {
            return Err(PoolError::InvalidFrameCount);
        }

        let file = PageFile::open(path)?;
        let logger = logger.new(o!("file" => file.path().display().to_string()));

        let frames = (0..num_frames).map(|_| Frame::empty()).collect();

        Ok(Self {
            file,
            frames,
            strategy,
            clock: 0,
            read_io: 0,
            write_io: 0,
            logger,
        })
    }

    /// Pin `page` into a frame, loading it from disk on a miss.
    ///
    /// A miss picks a victim (an empty frame, else the unpinned frame with
    /// the oldest stamp), writing the victim back first if it is dirty. A
    /// read past the end of the file grows the file and retries once, so
    /// pinning is also how callers allocate fresh pages.
    pub fn pin(&mut self, page: PageId) -> PoolResult<PageHandle> {
        self.clock += 1;

        if let Some(idx) = self.find_frame(page) {
            let frame = &mut self.frames[idx];
            frame.fix_count += 1;
            frame.last_used = self.clock;
            return Ok(PageHandle { page });
        }

        let idx = self
            .pick_victim()
            .ok_or(PoolError::NoFreeFrame(self.frames.len()))?;
        self.evict(idx)?;

        match self.file.read_block(page, &mut self.frames[idx].data) {
            Ok(()) => {}
            Err(StorageError::NonExistingPage(_)) => {
                self.file.ensure_capacity(page + 1)?;
                self.file.read_block(page, &mut self.frames[idx].data)?;
            }
            Err(e) => return Err(e.into()),
        }
        self.read_io += 1;

        let frame = &mut self.frames[idx];
        frame.page = Some(page);
        frame.fix_count = 1;
        frame.dirty = false;
        frame.last_used = self.clock;
        frame.loaded_at = self.clock;

        trace!(self.logger, "page loaded"; "page" => page, "frame" => idx);
        Ok(PageHandle { page })
    }

    /// Release one pin on the page behind `handle`.
    pub fn unpin(&mut self, handle: PageHandle) -> PoolResult<()> {
        let idx = self.resolve(&handle)?;
        let frame = &mut self.frames[idx];
        frame.fix_count = frame.fix_count.saturating_sub(1);
        Ok(())
    }

    /// Borrow the cached bytes of a pinned page.
    pub fn data(&self, handle: &PageHandle) -> PoolResult<&[u8]> {
        let idx = self.resolve(handle)?;
        Ok(&self.frames[idx].data)
    }

    /// Mutably borrow the cached bytes of a pinned page. Callers that modify
    /// the page must also call [`BufferPool::mark_dirty`].
    pub fn data_mut(&mut self, handle: &PageHandle) -> PoolResult<&mut [u8]> {
        let idx = self.resolve(handle)?;
        Ok(&mut self.frames[idx].data)
    }

    /// Flag the frame behind `handle` as modified.
    pub fn mark_dirty(&mut self, handle: &PageHandle) -> PoolResult<()> {
        let idx = self.resolve(handle)?;
        self.frames[idx].dirty = true;
        Ok(())
    }

    /// Write the page behind `handle` back to disk if it is dirty,
    /// regardless of its fix count.
    pub fn force_page(&mut self, handle: &PageHandle) -> PoolResult<()> {
        let idx = self.resolve(handle)?;
        if self.frames[idx].dirty {
            self.file.write_block(handle.page, &self.frames[idx].data)?;
            self.write_io += 1;
            self.frames[idx].dirty = false;
            trace!(self.logger, "page forced"; "page" => handle.page);
        }
        Ok(())
    }

    /// Write back every frame that is dirty and unpinned. Pinned dirty
    /// frames are left untouched.
    pub fn force_flush(&mut self) -> PoolResult<()> {
        let mut flushed = 0usize;
        for idx in 0..self.frames.len() {
            let frame = &self.frames[idx];
            let Some(page) = frame.page else { continue };
            if !frame.dirty || frame.fix_count > 0 {
                continue;
            }
            self.file.write_block(page, &self.frames[idx].data)?;
            self.write_io += 1;
            self.frames[idx].dirty = false;
            flushed += 1;
        }
        self.file.sync()?;
        if flushed > 0 {
            debug!(self.logger, "pool flushed"; "pages" => flushed);
        }
        Ok(())
    }

    /// Flush the pool and release frame memory. Fails without touching the
    /// pool when any page is still pinned.
    pub fn shutdown(&mut self) -> PoolResult<()> {
        let pinned = self.frames.iter().filter(|f| f.fix_count > 0).count();
        if pinned > 0 {
            return Err(PoolError::PinnedPages(pinned));
        }

        self.force_flush()?;
        self.frames.clear();
        debug!(self.logger, "pool shut down";
               "read_io" => self.read_io, "write_io" => self.write_io);
        Ok(())
    }

    /// Page cached in each frame, in frame order (`None` where empty)
    pub fn frame_contents(&self) -> Vec<Option<PageId>> {
        self.frames.iter().map(|f| f.page).collect()
    }

    /// Dirty flag of each frame, in frame order
    pub fn dirty_flags(&self) -> Vec<bool> {
        self.frames.iter().map(|f| f.dirty).collect()
    }

    /// Fix count of each frame, in frame order
    pub fn fix_counts(&self) -> Vec<u32> {
        self.frames.iter().map(|f| f.fix_count).collect()
    }

    /// Successful disk reads since construction. Never decreases.
    pub fn read_io(&self) -> u64 {
        self.read_io
    }

    /// Successful disk writes since construction. Never decreases.
    pub fn write_io(&self) -> u64 {
        self.write_io
    }

    /// Number of frames in the pool
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Pages in the underlying file
    pub fn total_pages(&self) -> usize {
        self.file.total_pages()
    }

    /// Configured replacement strategy
    pub fn strategy(&self) -> ReplacementStrategy {
        self.strategy
    }

    fn find_frame(&self, page: PageId) -> Option<usize> {
        self.frames.iter().position(|f| f.page == Some(page))
    }

    fn resolve(&self, handle: &PageHandle) -> PoolResult<usize> {
        self.find_frame(handle.page)
            .ok_or(PoolError::PageNotInPool(handle.page))
    }

    /// Pick a frame for the next load: any empty frame, else the unpinned
    /// frame with the oldest stamp for the configured strategy. `None` when
    /// every frame is pinned.
    fn pick_victim(&self) -> Option<usize> {
        if let Some(idx) = self.frames.iter().position(|f| f.page.is_none()) {
            return Some(idx);
        }

        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.fix_count == 0)
            .min_by_key(|(_, f)| match self.strategy.effective() {
                ReplacementStrategy::Fifo => f.loaded_at,
                _ => f.last_used,
            })
            .map(|(idx, _)| idx)
    }

    /// Write back and empty the frame at `idx`. A failed write-back leaves
    /// the frame dirty and occupied so a later flush can retry.
    fn evict(&mut self, idx: usize) -> PoolResult<()> {
        let frame = &self.frames[idx];
        let Some(page) = frame.page else {
            return Ok(());
        };

        if frame.dirty {
            self.file.write_block(page, &self.frames[idx].data)?;
            self.write_io += 1;
            self.frames[idx].dirty = false;
            debug!(self.logger, "dirty victim written back"; "page" => page, "frame" => idx);
        }

        self.frames[idx].page = None;
        Ok(())
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        // Best-effort write-back of whatever is still dirty and unpinned
        let _ = self.force_flush();
    }
}
