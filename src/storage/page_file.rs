use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};
use super::{PAGE_SIZE, PageId};

/// An open page file: a headerless sequence of `PAGE_SIZE` blocks.
///
/// The total page count is derived from the file length on open; a positional
/// cursor tracks the last block read or written and drives the
/// `read_*_block` conveniences.
pub struct PageFile {
    file: File,
    path: PathBuf,
    total_pages: usize,
    cur_page: PageId,
}

impl PageFile {
    /// Create a new page file holding a single zero-filled page.
    pub fn create<P: AsRef<Path>>(path: P) -> StorageResult<()> {
        let path = path.as_ref();

        if path.exists() {
            return Err(StorageError::FileExists(path.display().to_string()));
        }

        let mut file = File::create(path)?;
        file.write_all(&[0u8; PAGE_SIZE])?;
        file.sync_data()?;
        Ok(())
    }

    /// Open an existing page file. The byte length must be an exact multiple
    /// of `PAGE_SIZE`.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let path = path.as_ref();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    StorageError::FileNotFound(path.display().to_string())
                }
                _ => StorageError::Io(e),
            })?;

        let len = file.metadata()?.len();
        if !len.is_multiple_of(PAGE_SIZE as u64) {
            return Err(StorageError::NotPageAligned(len));
        }

        Ok(Self {
            file,
            path: path.to_path_buf(),
            total_pages: (len / PAGE_SIZE as u64) as usize,
            cur_page: 0,
        })
    }

    /// Remove a page file from disk.
    pub fn destroy<P: AsRef<Path>>(path: P) -> StorageResult<()> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(StorageError::FileNotFound(path.display().to_string()));
        }

        std::fs::remove_file(path)?;
        Ok(())
    }

    /// Path this file was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of blocks currently in the file
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Position of the last block read or written
    pub fn block_pos(&self) -> PageId {
        self.cur_page
    }

    fn check_buffer(buf: &[u8]) -> StorageResult<()> {
        if buf.len() != PAGE_SIZE {
            return Err(StorageError::BadBufferLength {
                expected: PAGE_SIZE,
                actual: buf.len(),
            });
        }
        Ok(())
    }

    /// Read block `page` into `buf` and move the cursor there.
    pub fn read_block(&mut self, page: PageId, buf: &mut [u8]) -> StorageResult<()> {
        Self::check_buffer(buf)?;

        if page >= self.total_pages {
            return Err(StorageError::NonExistingPage(page));
        }

        self.file.seek(SeekFrom::Start((page * PAGE_SIZE) as u64))?;
        self.file.read_exact(buf)?;
        self.cur_page = page;
        Ok(())
    }

    /// Overwrite block `page` from `buf` and move the cursor there.
    /// Never grows the file; use `append_empty_block` or `ensure_capacity`.
    pub fn write_block(&mut self, page: PageId, buf: &[u8]) -> StorageResult<()> {
        Self::check_buffer(buf)?;

        if page >= self.total_pages {
            return Err(StorageError::NonExistingPage(page));
        }

        self.file.seek(SeekFrom::Start((page * PAGE_SIZE) as u64))?;
        self.file.write_all(buf)?;
        self.cur_page = page;
        Ok(())
    }

    /// Read the first block of the file.
    pub fn read_first_block(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        self.read_block(0, buf)
    }

    /// Read the block before the cursor.
    pub fn read_previous_block(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        match self.cur_page.checked_sub(1) {
            Some(prev) => self.read_block(prev, buf),
            None => Err(StorageError::NonExistingPage(0)),
        }
    }

    /// Re-read the block at the cursor. Leaves the cursor unchanged.
    pub fn read_current_block(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        self.read_block(self.cur_page, buf)
    }

    /// Read the block after the cursor.
    pub fn read_next_block(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        self.read_block(self.cur_page + 1, buf)
    }

    /// Read the last block of the file.
    pub fn read_last_block(&mut self, buf: &mut [u8]) -> StorageResult<()> {
        match self.total_pages.checked_sub(1) {
            Some(last) => self.read_block(last, buf),
            None => Err(StorageError::NonExistingPage(0)),
        }
    }

    /// Overwrite the block at the cursor.
    pub fn write_current_block(&mut self, buf: &[u8]) -> StorageResult<()> {
        self.write_block(self.cur_page, buf)
    }

    /// Append one zero-filled block to the end of the file.
    pub fn append_empty_block(&mut self) -> StorageResult<()> {
        self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&[0u8; PAGE_SIZE])?;
        self.total_pages += 1;
        Ok(())
    }

    /// Append zero-filled blocks until the file holds at least `pages` blocks.
    pub fn ensure_capacity(&mut self, pages: usize) -> StorageResult<()> {
        while self.total_pages < pages {
            self.append_empty_block()?;
        }
        Ok(())
    }

    /// Flush OS buffers so previous writes are persisted.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_dir() -> TempDir {
        tempfile::tempdir().unwrap()
    }

    #[test]
    fn test_create_page_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        assert!(test_file.exists());
        assert_eq!(std::fs::metadata(&test_file).unwrap().len(), PAGE_SIZE as u64);
    }

    #[test]
    fn test_create_already_exists() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let result = PageFile::create(&test_file);
        assert!(matches!(result, Err(StorageError::FileExists(_))));
    }

    #[test]
    fn test_open_reports_one_page() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let file = PageFile::open(&test_file).unwrap();
        assert_eq!(file.total_pages(), 1);
        assert_eq!(file.block_pos(), 0);
    }

    #[test]
    fn test_open_nonexistent() {
        let temp_dir = setup_test_dir();
        let result = PageFile::open(temp_dir.path().join("missing.db"));
        assert!(matches!(result, Err(StorageError::FileNotFound(_))));
    }

    #[test]
    fn test_open_rejects_unaligned_file() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        std::fs::write(&test_file, vec![0u8; PAGE_SIZE + 17]).unwrap();
        let result = PageFile::open(&test_file);
        assert!(matches!(result, Err(StorageError::NotPageAligned(_))));
    }

    #[test]
    fn test_destroy() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        PageFile::destroy(&test_file).unwrap();
        assert!(!test_file.exists());

        let result = PageFile::destroy(&test_file);
        assert!(matches!(result, Err(StorageError::FileNotFound(_))));
    }

    #[test]
    fn test_read_write_block() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        let mut page = vec![0u8; PAGE_SIZE];
        page[0] = 42;
        page[PAGE_SIZE - 1] = 255;
        file.write_block(0, &page).unwrap();

        let mut back = vec![0u8; PAGE_SIZE];
        file.read_block(0, &mut back).unwrap();
        assert_eq!(back, page);
    }

    #[test]
    fn test_read_out_of_range() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        let mut buf = vec![0u8; PAGE_SIZE];
        let result = file.read_block(1, &mut buf);
        assert!(matches!(result, Err(StorageError::NonExistingPage(1))));
    }

    #[test]
    fn test_write_does_not_grow() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        let buf = vec![0u8; PAGE_SIZE];
        let result = file.write_block(1, &buf);
        assert!(matches!(result, Err(StorageError::NonExistingPage(1))));
        assert_eq!(file.total_pages(), 1);
    }

    #[test]
    fn test_bad_buffer_length() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        let mut small = vec![0u8; PAGE_SIZE - 1];
        let result = file.read_block(0, &mut small);
        assert!(matches!(result, Err(StorageError::BadBufferLength { .. })));

        let large = vec![0u8; PAGE_SIZE + 1];
        let result = file.write_block(0, &large);
        assert!(matches!(result, Err(StorageError::BadBufferLength { .. })));
    }

    #[test]
    fn test_append_empty_block() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        file.append_empty_block().unwrap();
        assert_eq!(file.total_pages(), 2);

        let mut buf = vec![1u8; PAGE_SIZE];
        file.read_block(1, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_ensure_capacity() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        file.ensure_capacity(6).unwrap();
        assert_eq!(file.total_pages(), 6);

        // Already large enough: no change
        file.ensure_capacity(3).unwrap();
        assert_eq!(file.total_pages(), 6);

        drop(file);
        assert_eq!(
            std::fs::metadata(&test_file).unwrap().len(),
            6 * PAGE_SIZE as u64
        );
    }

    #[test]
    fn test_cursor_navigation() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();
        file.ensure_capacity(4).unwrap();

        // Tag each page with its own number
        for page in 0..4 {
            let mut buf = vec![0u8; PAGE_SIZE];
            buf[0] = page as u8;
            file.write_block(page, &buf).unwrap();
        }

        let mut buf = vec![0u8; PAGE_SIZE];

        file.read_first_block(&mut buf).unwrap();
        assert_eq!(buf[0], 0);
        assert_eq!(file.block_pos(), 0);

        file.read_next_block(&mut buf).unwrap();
        assert_eq!(buf[0], 1);
        file.read_next_block(&mut buf).unwrap();
        assert_eq!(buf[0], 2);
        assert_eq!(file.block_pos(), 2);

        file.read_previous_block(&mut buf).unwrap();
        assert_eq!(buf[0], 1);
        assert_eq!(file.block_pos(), 1);

        file.read_current_block(&mut buf).unwrap();
        assert_eq!(buf[0], 1);
        assert_eq!(file.block_pos(), 1);

        file.read_last_block(&mut buf).unwrap();
        assert_eq!(buf[0], 3);
        assert_eq!(file.block_pos(), 3);

        let result = file.read_next_block(&mut buf);
        assert!(matches!(result, Err(StorageError::NonExistingPage(4))));
        // Failed read leaves the cursor alone
        assert_eq!(file.block_pos(), 3);
    }

    #[test]
    fn test_previous_before_first() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();

        let mut buf = vec![0u8; PAGE_SIZE];
        let result = file.read_previous_block(&mut buf);
        assert!(matches!(result, Err(StorageError::NonExistingPage(_))));
    }

    #[test]
    fn test_write_current_block() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        let mut file = PageFile::open(&test_file).unwrap();
        file.ensure_capacity(2).unwrap();

        let mut buf = vec![0u8; PAGE_SIZE];
        file.read_block(1, &mut buf).unwrap();

        buf[7] = 99;
        file.write_current_block(&buf).unwrap();

        let mut back = vec![0u8; PAGE_SIZE];
        file.read_block(1, &mut back).unwrap();
        assert_eq!(back[7], 99);
    }

    #[test]
    fn test_persistence_across_open() {
        let temp_dir = setup_test_dir();
        let test_file = temp_dir.path().join("t.db");

        PageFile::create(&test_file).unwrap();
        {
            let mut file = PageFile::open(&test_file).unwrap();
            file.ensure_capacity(3).unwrap();
            let mut buf = vec![0u8; PAGE_SIZE];
            buf[100] = 7;
            file.write_block(2, &buf).unwrap();
            file.sync().unwrap();
        }

        let mut file = PageFile::open(&test_file).unwrap();
        assert_eq!(file.total_pages(), 3);
        let mut buf = vec![0u8; PAGE_SIZE];
        file.read_block(2, &mut buf).unwrap();
        assert_eq!(buf[100], 7);
    }
}
