use std::fs::File;
use std::io::{ErrorKind as IoErrorKind, Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};
use crate::core::error::{Error, ErrorKind, Result};

pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Fixed-capacity chunk of file bytes
pub struct Page {
    data: Box<[u8]>,
    valid: usize,
}

impl Page {
    fn allocate(capacity: usize) -> Result<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity).map_err(|e| {
            Error::allocation(format!("page buffer of {} bytes: {}", capacity, e))
        })?;
        data.resize(capacity, 0);

        Ok(Page {
            data: data.into_boxed_slice(),
            valid: 0,
        })
    }

    /// Valid bytes only; the tail of a partial page is never exposed
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.valid]
    }

    pub fn valid(&self) -> usize {
        self.valid
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn is_full(&self) -> bool {
        self.valid == self.data.len()
    }
}

/// A whole file held as an ordered list of pages
pub struct PageSequence {
    pages: Vec<Page>,
    page_size: usize,
    len: usize,
}

impl PageSequence {
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            Error::new(ErrorKind::Io, format!("{}: {}", path.display(), e))
        })?;
        Self::load(file, page_size)
    }

    /// Page the full contents of `reader` into memory
    pub fn load<R: Read + Seek>(mut reader: R, page_size: usize) -> Result<Self> {
        if page_size == 0 || !page_size.is_power_of_two() {
            return Err(Error::invalid_argument(format!(
                "page size must be a power of two, got {}",
                page_size
            )));
        }

        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let file_size = usize::try_from(file_size)
            .map_err(|_| Error::allocation(format!("file of {} bytes", file_size)))?;

        let page_count = file_size.div_ceil(page_size);
        let mut pages = Vec::new();
        pages.try_reserve_exact(page_count).map_err(|e| {
            Error::allocation(format!("page table for {} pages: {}", page_count, e))
        })?;

        let mut len = 0;
        for index in 0..page_count {
            // Earlier pages are released by drop if this fails
            let mut page = Page::allocate(page_size)?;
            let want = page_size.min(file_size - len);

            page.valid = fill(&mut reader, &mut page.data[..want]).map_err(|e| {
                Error::new(ErrorKind::ReadFailure, format!("page {}: {}", index, e))
            })?;
            len += page.valid;

            let short = page.valid < want;
            if page.valid > 0 {
                pages.push(page);
            }
            if short {
                warn!(expected = file_size, read = len, "file shrank while paging");
                break;
            }
        }

        debug!(pages = pages.len(), bytes = len, page_size, "file paged");

        Ok(PageSequence {
            pages,
            page_size,
            len,
        })
    }

    /// Total valid bytes across all pages
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Translate a logical offset into (page index, offset within the page)
    pub fn locate(&self, offset: usize) -> (usize, usize) {
        (offset / self.page_size, offset % self.page_size)
    }

    /// Append the bytes of `range` to `out`, walking page by page.
    /// Only bytes inside the file are copied; the number copied is returned.
    pub fn copy_range(&self, range: Range<usize>, out: &mut Vec<u8>) -> Result<usize> {
        let end = range.end.min(self.len);
        if range.start >= end {
            return Ok(0);
        }

        out.try_reserve(end - range.start)?;

        let mut offset = range.start;
        while offset < end {
            let (page_index, in_page) = self.locate(offset);
            let page = match self.pages.get(page_index) {
                Some(page) => page,
                None => break,
            };
            let bytes = page.bytes();
            if in_page >= bytes.len() {
                break;
            }

            let take = (bytes.len() - in_page).min(end - offset);
            out.extend_from_slice(&bytes[in_page..in_page + take]);
            offset += take;
        }

        Ok(offset - range.start)
    }
}

/// Read until `buf` is full or the reader hits EOF
fn fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
