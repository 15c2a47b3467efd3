pub mod worker;
pub mod merger;
pub mod reducer;
#[cfg(unix)]
pub mod process;

pub use reducer::{reduce_max, Executor, MaxReducer, ThreadExecutor};
pub use worker::{scan_chunk, ChunkPlan};
#[cfg(unix)]
pub use process::ProcessExecutor;
