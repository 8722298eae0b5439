use serde::{Deserialize, Serialize};

/// Whole-lesson countdown in seconds.
///
/// The clock only moves when `tick()` is called; whether the lesson is
/// running is owned by the scheduler's `TimerState`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedClock {
    total_secs: u64,
    remaining_secs: u64,
}

impl ElapsedClock {
    pub fn new(total_secs: u64) -> Self {
        Self {
            total_secs,
            remaining_secs: total_secs,
        }
    }

    /// Count down one second. Returns `false` once the clock has run out.
    pub fn tick(&mut self) -> bool {
        if self.remaining_secs == 0 {
            return false;
        }
        self.remaining_secs -= 1;
        true
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn total_secs(&self) -> u64 {
        self.total_secs
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.total_secs - self.remaining_secs
    }
}
