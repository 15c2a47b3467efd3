use std::sync::Arc;
use crossbeam::channel::{unbounded, Sender};
use rayon::{Scope, ThreadPool, ThreadPoolBuilder};
use tracing::debug;
use crate::core::config::{Config, ExecutionMode};
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{ParsedRecord, Reduction, ReductionResult, WorkerReport};
use crate::parallel::merger::SharedResult;
use crate::parallel::worker::{scan_chunk, ChunkPlan};

/// Schedules one `scan_chunk` per chunk and merges the local maxima
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute(&self, records: &[ParsedRecord], plan: &ChunkPlan) -> Result<Reduction>;
}

/// Workers as tasks on a rayon pool, merging through a shared mutex
pub struct ThreadExecutor {
    pool: Option<Arc<ThreadPool>>,
}

impl ThreadExecutor {
    /// Run on rayon's global pool
    pub fn global() -> Self {
        ThreadExecutor { pool: None }
    }

    /// Run on a dedicated pool of `threads` threads
    pub fn with_threads(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("pagescan-worker-{}", i))
            .build()
            .map_err(|e| Error::new(ErrorKind::Internal, format!("thread pool: {}", e)))?;

        Ok(ThreadExecutor {
            pool: Some(Arc::new(pool)),
        })
    }

    fn run(&self, records: &[ParsedRecord], plan: &ChunkPlan) -> Reduction {
        let shared = SharedResult::new();
        let (report_tx, report_rx) = unbounded();

        match &self.pool {
            Some(pool) => pool.scope(|s| spawn_workers(s, records, plan, &shared, &report_tx)),
            None => rayon::scope(|s| spawn_workers(s, records, plan, &shared, &report_tx)),
        }
        drop(report_tx);

        let mut reports: Vec<WorkerReport> = report_rx.iter().collect();
        reports.sort_by_key(|r| r.worker);

        Reduction {
            result: shared.into_inner(),
            reports,
        }
    }
}

fn spawn_workers<'scope>(
    s: &Scope<'scope>,
    records: &'scope [ParsedRecord],
    plan: &ChunkPlan,
    shared: &'scope SharedResult,
    report_tx: &Sender<WorkerReport>,
) {
    for (worker, range) in plan.chunks() {
        let report_tx = report_tx.clone();
        s.spawn(move |_| {
            let local = scan_chunk(&records[range.clone()], range.start);
            shared.merge(&local);
            let _ = report_tx.send(WorkerReport {
                worker,
                range,
                local,
                peak_rss_kb: None,
            });
        });
    }
}

impl Default for ThreadExecutor {
    fn default() -> Self {
        ThreadExecutor::global()
    }
}

impl Executor for ThreadExecutor {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn execute(&self, records: &[ParsedRecord], plan: &ChunkPlan) -> Result<Reduction> {
        Ok(self.run(records, plan))
    }
}

/// Maximum search over a record array with a configurable executor
pub struct MaxReducer {
    executor: Box<dyn Executor>,
    records_per_worker: usize,
    max_workers: Option<usize>,
}

impl MaxReducer {
    pub fn new(executor: Box<dyn Executor>, records_per_worker: usize) -> Self {
        MaxReducer {
            executor,
            records_per_worker: records_per_worker.max(1),
            max_workers: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let executor: Box<dyn Executor> = match config.execution {
            ExecutionMode::Threads => Box::new(ThreadExecutor::global()),
            #[cfg(unix)]
            ExecutionMode::Processes => Box::new(crate::parallel::process::ProcessExecutor::new()),
            #[cfg(not(unix))]
            ExecutionMode::Processes => {
                return Err(Error::invalid_argument("process workers need a unix platform"));
            }
        };

        let mut reducer = MaxReducer::new(executor, config.records_per_worker);
        reducer.max_workers = match config.execution {
            // One process per core unless told otherwise
            ExecutionMode::Processes => config.max_workers.or_else(|| Some(num_cpus::get())),
            ExecutionMode::Threads => config.max_workers,
        };
        Ok(reducer)
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = Some(max_workers.max(1));
        self
    }

    pub fn plan(&self, len: usize) -> ChunkPlan {
        let plan = ChunkPlan::by_records_per_worker(len, self.records_per_worker);
        match self.max_workers {
            Some(max) => plan.capped(max),
            None => plan,
        }
    }

    pub fn reduce(&self, records: &[ParsedRecord]) -> Result<Reduction> {
        if records.is_empty() {
            return Ok(Reduction {
                result: ReductionResult::no_winner(),
                reports: Vec::new(),
            });
        }

        let plan = self.plan(records.len());
        debug!(
            executor = self.executor.name(),
            records = records.len(),
            workers = plan.workers(),
            "reducing"
        );
        self.executor.execute(records, &plan)
    }
}

/// Maximum by value over `records` with `worker_count` thread workers.
/// Empty input gives the no-winner result.
pub fn reduce_max(records: &[ParsedRecord], worker_count: usize) -> ReductionResult {
    if records.is_empty() {
        return ReductionResult::no_winner();
    }
    let plan = ChunkPlan::by_worker_count(records.len(), worker_count);
    ThreadExecutor::global().run(records, &plan).result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(values: &[u64]) -> Vec<ParsedRecord> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ParsedRecord::new(&format!("r{}", i), *v))
            .collect()
    }

    #[test]
    fn test_reduce_max_example() {
        let recs = vec![
            ParsedRecord::new("A", 10),
            ParsedRecord::new("B", 50),
            ParsedRecord::new("C", 30),
        ];
        let result = reduce_max(&recs, 2);
        assert_eq!(result.value, 50);
        assert_eq!(result.text.as_deref(), Some("B"));
        assert_eq!(result.record_index, Some(1));
    }

    #[test]
    fn test_reduce_max_empty() {
        assert_eq!(reduce_max(&[], 4), ReductionResult::no_winner());
    }

    #[test]
    fn test_all_zero_has_no_winner() {
        let result = reduce_max(&records(&[0, 0, 0]), 2);
        assert!(!result.has_winner());
        assert_eq!(result.value, 0);
    }

    #[test]
    fn test_worker_counts_agree() {
        let values: Vec<u64> = (0..5000u64).map(|i| (i * 7919) % 10007).collect();
        let recs = records(&values);
        let expected = *values.iter().max().unwrap();

        for workers in [1, 2, 3, 8, 64] {
            assert_eq!(reduce_max(&recs, workers).value, expected);
        }
    }

    #[test]
    fn test_unique_max_text_is_stable() {
        let mut values = vec![1u64; 1000];
        values[777] = 99;
        let recs = records(&values);

        for workers in [1, 4, 16] {
            let result = reduce_max(&recs, workers);
            assert_eq!(result.text.as_deref(), Some("r777"));
        }
    }

    #[test]
    fn test_reducer_reports_every_worker() {
        let reducer = MaxReducer::new(Box::new(ThreadExecutor::with_threads(3).unwrap()), 100);
        let recs = records(&(0..1050u64).collect::<Vec<_>>());

        let reduction = reducer.reduce(&recs).unwrap();
        assert_eq!(reduction.worker_count(), 10);
        assert_eq!(reduction.reports[9].range, 900..1050);
        assert_eq!(reduction.result.value, 1049);
        assert_eq!(reduction.peak_rss_kb(), None);
    }

    #[test]
    fn test_reducer_respects_max_workers() {
        let reducer = MaxReducer::new(Box::new(ThreadExecutor::global()), 10).with_max_workers(2);
        let recs = records(&(0..100u64).collect::<Vec<_>>());
        assert_eq!(reducer.reduce(&recs).unwrap().worker_count(), 2);
    }
}
