use std::fs::File;
use std::io::{self, Read};
use std::ops::Range;
use std::os::fd::{FromRawFd, RawFd};
use std::panic::{self, AssertUnwindSafe};
use serde::{Serialize, Deserialize};
use tracing::debug;
use crate::core::error::{Error, Result};
use crate::core::types::{BoundedText, LocalMax, ParsedRecord, Reduction, WorkerReport, MAX_TEXT_LEN};
use crate::parallel::merger::merge_in_order;
use crate::parallel::reducer::Executor;
use crate::parallel::worker::{scan_chunk, ChunkPlan};

/// Upper bound of an encoded report; the text is at most `MAX_TEXT_LEN` bytes
const REPORT_CAPACITY: usize = 256;

/// Report as written by the child. Borrowed so encoding never allocates.
#[derive(Serialize)]
struct WireReport<'a> {
    worker: u64,
    value: u64,
    index: Option<u64>,
    text: &'a [u8],
    peak_rss_kb: u64,
}

#[derive(Deserialize)]
struct OwnedReport {
    worker: u64,
    value: u64,
    index: Option<u64>,
    text: Vec<u8>,
    peak_rss_kb: u64,
}

/// One forked child per chunk, each answering over its own pipe.
///
/// Children share nothing with the parent after the fork. The parent reads
/// the reports in chunk order and merges them sequentially, so between equal
/// maxima the lowest chunk always wins.
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        ProcessExecutor
    }
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        ProcessExecutor::new()
    }
}

impl Executor for ProcessExecutor {
    fn name(&self) -> &'static str {
        "processes"
    }

    fn execute(&self, records: &[ParsedRecord], plan: &ChunkPlan) -> Result<Reduction> {
        let mut children = Vec::with_capacity(plan.workers());
        for (worker, range) in plan.chunks() {
            match spawn_worker(records, worker, range) {
                Ok(child) => children.push(child),
                Err(e) => {
                    // Reap what was already started before reporting
                    for child in children {
                        let _ = child.collect();
                    }
                    return Err(e);
                }
            }
        }
        debug!(children = children.len(), "worker processes started");

        let mut reports = Vec::with_capacity(children.len());
        let mut failure = None;
        for child in children {
            match child.collect() {
                Ok(report) => reports.push(report),
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let result = merge_in_order(reports.iter().map(|r| &r.local));
        Ok(Reduction { result, reports })
    }
}

struct Child {
    pid: libc::pid_t,
    worker: usize,
    range: Range<usize>,
    pipe: File,
}

impl Child {
    /// Drain the pipe, reap the process and decode its report
    fn collect(self) -> Result<WorkerReport> {
        let Child { pid, worker, range, mut pipe } = self;

        let mut buf = Vec::with_capacity(REPORT_CAPACITY);
        let read = pipe.read_to_end(&mut buf);
        drop(pipe);

        let status = wait_for(pid)?;
        read.map_err(|e| Error::worker(format!("worker {} pipe: {}", worker, e)))?;

        if !libc::WIFEXITED(status) {
            return Err(Error::worker(format!(
                "worker {} (pid {}) killed by signal {}",
                worker,
                pid,
                libc::WTERMSIG(status)
            )));
        }
        if libc::WEXITSTATUS(status) != 0 {
            return Err(Error::worker(format!(
                "worker {} (pid {}) exited with status {}",
                worker,
                pid,
                libc::WEXITSTATUS(status)
            )));
        }

        let report: OwnedReport = bincode::deserialize(&buf)
            .map_err(|e| Error::worker(format!("worker {} sent a bad report: {}", worker, e)))?;
        if report.worker != worker as u64 {
            return Err(Error::worker(format!(
                "expected report from worker {}, got {}",
                worker, report.worker
            )));
        }

        Ok(WorkerReport {
            worker,
            range,
            local: LocalMax {
                value: report.value,
                index: report.index.map(|i| i as usize),
                text: BoundedText::new(&report.text, MAX_TEXT_LEN),
            },
            peak_rss_kb: (report.peak_rss_kb > 0).then_some(report.peak_rss_kb),
        })
    }
}

fn spawn_worker(records: &[ParsedRecord], worker: usize, range: Range<usize>) -> Result<Child> {
    let mut fds: [RawFd; 2] = [-1; 2];
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(Error::worker(format!("pipe: {}", io::Error::last_os_error())));
    }
    let (read_fd, write_fd) = (fds[0], fds[1]);

    match unsafe { libc::fork() } {
        -1 => {
            let err = io::Error::last_os_error();
            unsafe {
                libc::close(read_fd);
                libc::close(write_fd);
            }
            Err(Error::worker(format!("fork for worker {}: {}", worker, err)))
        }
        0 => {
            unsafe {
                libc::close(read_fd);
            }
            run_child(records, worker, range, write_fd)
        }
        pid => {
            unsafe {
                libc::close(write_fd);
            }
            Ok(Child {
                pid,
                worker,
                range,
                pipe: unsafe { File::from_raw_fd(read_fd) },
            })
        }
    }
}

/// Child side. Must not allocate, log or return into the parent's code.
fn run_child(records: &[ParsedRecord], worker: usize, range: Range<usize>, fd: RawFd) -> ! {
    let ok = panic::catch_unwind(AssertUnwindSafe(|| child_body(records, worker, range, fd)));
    let code = if matches!(ok, Ok(true)) { 0 } else { 1 };
    unsafe { libc::_exit(code) }
}

fn child_body(records: &[ParsedRecord], worker: usize, range: Range<usize>, fd: RawFd) -> bool {
    let local = scan_chunk(&records[range.clone()], range.start);
    let report = WireReport {
        worker: worker as u64,
        value: local.value,
        index: local.index.map(|i| i as u64),
        text: local.text.as_bytes(),
        peak_rss_kb: peak_rss_kb(),
    };

    let mut buf = [0u8; REPORT_CAPACITY];
    let written = {
        let mut cursor: &mut [u8] = &mut buf;
        if bincode::serialize_into(&mut cursor, &report).is_err() {
            return false;
        }
        REPORT_CAPACITY - cursor.len()
    };

    write_all_fd(fd, &buf[..written])
}

fn write_all_fd(fd: RawFd, mut bytes: &[u8]) -> bool {
    while !bytes.is_empty() {
        let n = unsafe { libc::write(fd, bytes.as_ptr() as *const libc::c_void, bytes.len()) };
        if n < 0 {
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            return false;
        }
        bytes = &bytes[n as usize..];
    }
    true
}

fn wait_for(pid: libc::pid_t) -> Result<libc::c_int> {
    let mut status: libc::c_int = 0;
    loop {
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(Error::worker(format!("waitpid {}: {}", pid, err)));
        }
    }
}

/// Peak resident set of the calling process in KiB, 0 if unknown
fn peak_rss_kb() -> u64 {
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    if unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) } != 0 {
        return 0;
    }
    let max_rss = usage.ru_maxrss.max(0) as u64;
    // ru_maxrss is bytes on macOS, KiB elsewhere
    if cfg!(target_os = "macos") { max_rss / 1024 } else { max_rss }
}
