use std::borrow::Cow;
use std::fmt;
use std::ops::Range;
use serde::{Serialize, Deserialize};

/// Bytes reserved for the text field of a parsed record
pub const TEXT_CAPACITY: usize = 128;

/// Longest text actually kept, one byte short of the capacity
pub const MAX_TEXT_LEN: usize = TEXT_CAPACITY - 1;

/// Fixed-width text field. Longer input is truncated on a UTF-8 boundary.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BoundedText {
    bytes: [u8; TEXT_CAPACITY],
    len: u8,
}

impl BoundedText {
    pub const fn empty() -> Self {
        BoundedText {
            bytes: [0u8; TEXT_CAPACITY],
            len: 0,
        }
    }

    pub fn new(src: &[u8], max_len: usize) -> Self {
        let kept = truncate_utf8(src, max_len.min(MAX_TEXT_LEN));
        let mut bytes = [0u8; TEXT_CAPACITY];
        bytes[..kept.len()].copy_from_slice(kept);
        BoundedText {
            bytes,
            len: kept.len() as u8,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.as_bytes())
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for BoundedText {
    fn default() -> Self {
        BoundedText::empty()
    }
}

impl fmt::Debug for BoundedText {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

/// Cut `src` to at most `max_len` bytes without splitting a multi-byte character
fn truncate_utf8(src: &[u8], max_len: usize) -> &[u8] {
    if src.len() <= max_len {
        return src;
    }
    let mut end = max_len;
    while end > 0 && (src[end] & 0xC0) == 0x80 {
        end -= 1;
    }
    &src[..end]
}

/// One data row reduced to the two columns the pipeline cares about
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParsedRecord {
    pub text: BoundedText,
    pub value: u64,
}

impl ParsedRecord {
    pub fn new(text: &str, value: u64) -> Self {
        ParsedRecord {
            text: BoundedText::new(text.as_bytes(), MAX_TEXT_LEN),
            value,
        }
    }
}

/// Best record found by a single worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalMax {
    pub value: u64,
    /// Absolute index into the record array, `None` when nothing beat zero
    pub index: Option<usize>,
    pub text: BoundedText,
}

/// The global maximum. `value == 0` with no text means no winner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionResult {
    pub value: u64,
    pub text: Option<String>,
    pub record_index: Option<usize>,
}

impl ReductionResult {
    pub fn no_winner() -> Self {
        ReductionResult::default()
    }

    pub fn has_winner(&self) -> bool {
        self.text.is_some()
    }

    /// Strictly-greater merge: an equal value never replaces the current winner
    pub fn merge(&mut self, local: &LocalMax) -> bool {
        match local.index {
            Some(index) if local.value > self.value => {
                self.value = local.value;
                self.text = Some(local.text.as_str().into_owned());
                self.record_index = Some(index);
                true
            }
            _ => false,
        }
    }
}

/// What one worker did, as seen by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker: usize,
    pub range: Range<usize>,
    pub local: LocalMax,
    /// Peak resident set of the worker process, only known for process workers
    pub peak_rss_kb: Option<u64>,
}

/// Reduction outcome together with the per-worker breakdown
#[derive(Debug, Clone)]
pub struct Reduction {
    pub result: ReductionResult,
    pub reports: Vec<WorkerReport>,
}

impl Reduction {
    pub fn worker_count(&self) -> usize {
        self.reports.len()
    }

    pub fn peak_rss_kb(&self) -> Option<u64> {
        self.reports.iter().filter_map(|r| r.peak_rss_kb).max()
    }
}
