//! Pacing: is the learner ahead of the clock, and is it time to say so.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaceVerdict {
    pub is_ahead: bool,
}

/// Compare the committed stage against the stage elapsed time implies.
///
/// Equal indices count as on schedule, which is reported as not ahead.
pub fn evaluate(authoritative_index: usize, time_implied_index: usize) -> PaceVerdict {
    PaceVerdict {
        is_ahead: authoritative_index > time_implied_index,
    }
}

/// Whether a pace notification is due at `elapsed_secs`.
///
/// Fires on every positive multiple of `interval_secs`, at most once per
/// elapsed second. An interval of zero disables pace checks.
pub fn should_fire(elapsed_secs: u64, last_checked_secs: Option<u64>, interval_secs: u64) -> bool {
    elapsed_secs > 0
        && interval_secs > 0
        && elapsed_secs % interval_secs == 0
        && last_checked_secs != Some(elapsed_secs)
}
