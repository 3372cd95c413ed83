//! Progress reporting for long-running action lists.

use crate::plan::Action;

/// Receives progress updates while a plan is applied.
///
/// Weights approximate wall-clock cost: one unit per action plus one unit
/// per 100 KiB of payload, derived from the empirical 1 ms/file + 10 ms/MB
/// model the progress display is calibrated against.
pub trait ProgressSink {
    /// Announces the total weight of the work about to run.
    fn begin(&mut self, total_weight: u64) {
        let _ = total_weight;
    }

    /// Reports completion of one action of the given weight.
    fn advance(&mut self, weight: u64) {
        let _ = weight;
    }
}

/// Sink that discards all updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {}

/// Returns the progress weight of `action`.
#[must_use]
pub fn action_weight(action: &Action) -> u64 {
    1 + action.size() / 102_400
}
