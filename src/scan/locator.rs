use std::ops::Range;
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::storage::page::PageSequence;

/// Record start offsets followed by a `file_len + 1` sentinel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryList {
    offsets: Vec<usize>,
    file_len: usize,
}

impl BoundaryList {
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Number of boundaries, sentinel included
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn file_len(&self) -> usize {
        self.file_len
    }

    /// Byte range of record `index`, separator included when present
    pub fn record_range(&self, index: usize) -> Option<Range<usize>> {
        let start = *self.offsets.get(index)?;
        let next = *self.offsets.get(index + 1)?;
        Some(start..next.min(self.file_len))
    }

    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| w[0]..w[1].min(self.file_len))
    }
}

/// Find every record start in `pages`.
///
/// A separator that ends the file does not open a new record, so a trailing
/// newline never produces an empty final record.
pub fn locate_records(
    pages: &PageSequence,
    separator: u8,
    initial_capacity: usize,
) -> Result<BoundaryList> {
    let file_len = pages.len();
    let mut offsets: Vec<usize> = Vec::new();
    offsets.try_reserve_exact(initial_capacity.max(2))?;
    offsets.push(0);

    let page_size = pages.page_size();
    for (page_index, page) in pages.pages().iter().enumerate() {
        let base = page_index * page_size;
        for (i, &byte) in page.bytes().iter().enumerate() {
            if byte != separator {
                continue;
            }
            let next = base + i + 1;
            if next == file_len {
                continue;
            }
            if offsets.len() == offsets.capacity() {
                let grow = offsets.capacity();
                offsets.try_reserve_exact(grow).map_err(|e| {
                    Error::allocation(format!("boundary list beyond {} entries: {}", grow, e))
                })?;
            }
            offsets.push(next);
        }
    }

    if offsets.len() == offsets.capacity() {
        offsets.try_reserve_exact(1)?;
    }
    offsets.push(file_len + 1);

    debug!(records = offsets.len() - 1, bytes = file_len, "record boundaries located");

    Ok(BoundaryList { offsets, file_len })
}
