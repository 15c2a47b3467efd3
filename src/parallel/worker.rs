use std::ops::Range;
use crate::core::types::{LocalMax, ParsedRecord};

/// Contiguous split of a record array, one chunk per worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    len: usize,
    chunk_size: usize,
    workers: usize,
}

impl ChunkPlan {
    /// `len / records_per_worker` workers (at least one); the last absorbs the remainder
    pub fn by_records_per_worker(len: usize, records_per_worker: usize) -> Self {
        let chunk_size = records_per_worker.max(1);
        ChunkPlan {
            len,
            chunk_size,
            workers: (len / chunk_size).max(1),
        }
    }

    /// At most `workers` chunks of `len / workers` records
    pub fn by_worker_count(len: usize, workers: usize) -> Self {
        let workers = workers.max(1);
        Self::by_records_per_worker(len, (len / workers).max(1))
    }

    /// Same chunk size, but never more than `max_workers` workers
    pub fn capped(self, max_workers: usize) -> Self {
        if self.workers <= max_workers.max(1) {
            return self;
        }
        Self::by_worker_count(self.len, max_workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk(&self, worker: usize) -> Range<usize> {
        let start = (worker * self.chunk_size).min(self.len);
        let end = if worker + 1 == self.workers {
            self.len
        } else {
            ((worker + 1) * self.chunk_size).min(self.len)
        };
        start..end
    }

    pub fn chunks(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        (0..self.workers).map(move |w| (w, self.chunk(w)))
    }
}

/// Unit of work shared by every executor: the strict maximum of one chunk.
/// `offset` is the absolute index of `records[0]`.
pub fn scan_chunk(records: &[ParsedRecord], offset: usize) -> LocalMax {
    let mut best = LocalMax::default();
    for (i, record) in records.iter().enumerate() {
        if record.value > best.value {
            best.value = record.value;
            best.index = Some(offset + i);
            best.text = record.text;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_chunk_absorbs_remainder() {
        let plan = ChunkPlan::by_records_per_worker(2550, 1000);
        assert_eq!(plan.workers(), 2);
        assert_eq!(plan.chunk(0), 0..1000);
        assert_eq!(plan.chunk(1), 1000..2550);
    }

    #[test]
    fn test_small_input_gets_one_worker() {
        let plan = ChunkPlan::by_records_per_worker(3, 1000);
        assert_eq!(plan.workers(), 1);
        assert_eq!(plan.chunk(0), 0..3);

        let empty = ChunkPlan::by_records_per_worker(0, 1000);
        assert_eq!(empty.workers(), 1);
        assert_eq!(empty.chunk(0), 0..0);
    }

    #[test]
    fn test_by_worker_count_covers_everything() {
        for (len, workers) in [(10, 3), (7, 7), (5, 8), (1000, 6)] {
            let plan = ChunkPlan::by_worker_count(len, workers);
            assert!(plan.workers() <= workers);

            let mut next = 0;
            for (_, range) in plan.chunks() {
                assert_eq!(range.start, next);
                next = range.end;
            }
            assert_eq!(next, len);
        }
    }

    #[test]
    fn test_capped() {
        let plan = ChunkPlan::by_records_per_worker(10_000, 100).capped(4);
        assert_eq!(plan.workers(), 4);
        assert_eq!(plan.chunk(3), 7500..10_000);
    }

    #[test]
    fn test_scan_chunk_first_max_wins() {
        let records = vec![
            ParsedRecord::new("a", 3),
            ParsedRecord::new("b", 9),
            ParsedRecord::new("c", 9),
        ];
        let best = scan_chunk(&records, 10);
        assert_eq!(best.value, 9);
        assert_eq!(best.index, Some(11));
        assert_eq!(best.text.as_str(), "b");
    }

    #[test]
    fn test_scan_chunk_all_zero() {
        let records = vec![ParsedRecord::new("a", 0)];
        assert_eq!(scan_chunk(&records, 0), LocalMax::default());
    }
}
