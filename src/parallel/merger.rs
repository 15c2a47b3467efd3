use parking_lot::Mutex;
use crate::core::types::{LocalMax, ReductionResult};

/// Global maximum shared by concurrent workers.
/// The lock is held only for the compare-and-replace step.
pub struct SharedResult {
    inner: Mutex<ReductionResult>,
}

impl SharedResult {
    pub fn new() -> Self {
        SharedResult {
            inner: Mutex::new(ReductionResult::no_winner()),
        }
    }

    /// Returns true when `local` became the new global maximum
    pub fn merge(&self, local: &LocalMax) -> bool {
        if local.index.is_none() {
            return false;
        }
        self.inner.lock().merge(local)
    }

    pub fn into_inner(self) -> ReductionResult {
        self.inner.into_inner()
    }
}

impl Default for SharedResult {
    fn default() -> Self {
        SharedResult::new()
    }
}

/// Sequential merge used when worker results arrive as messages
pub fn merge_in_order<'a, I>(locals: I) -> ReductionResult
where
    I: IntoIterator<Item = &'a LocalMax>,
{
    let mut result = ReductionResult::no_winner();
    for local in locals {
        result.merge(local);
    }
    result
}
