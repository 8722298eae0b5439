use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{DurationMode, TimerState};

/// Why the authoritative stage moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageChangeCause {
    /// Elapsed time crossed into a later stage.
    Auto,
    /// The learner jumped.
    Manual,
}

/// Every state change of a lesson timer produces an Event.
/// The UI layer observes them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        stage_index: usize,
        stage_id: String,
        mode: DurationMode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: DurationMode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    /// Duration mode flipped; progress was discarded.
    ModeToggled {
        mode: DurationMode,
        total_secs: u64,
        at: DateTime<Utc>,
    },
    StageChanged {
        from_stage: usize,
        stage_index: usize,
        stage_id: String,
        cause: StageChangeCause,
        at: DateTime<Utc>,
    },
    PaceCheck {
        elapsed_secs: u64,
        stage_index: usize,
        expected_stage_index: usize,
        is_ahead: bool,
        at: DateTime<Utc>,
    },
    LessonCompleted {
        elapsed_secs: u64,
        stage_index: usize,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        mode: DurationMode,
        stage_index: usize,
        stage_id: String,
        stage_label: String,
        expected_stage_index: usize,
        is_ahead: bool,
        remaining_secs: u64,
        total_secs: u64,
        stage_progress: f64,
        lesson_progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Route this event to the matching observer callback.
    pub fn dispatch<O: LessonObserver + ?Sized>(&self, observer: &mut O) {
        observer.on_event(self);
        match self {
            Event::StageChanged { stage_id, .. } => observer.on_stage_changed(stage_id),
            Event::PaceCheck { is_ahead, .. } => observer.on_pace_check(*is_ahead),
            Event::LessonCompleted { .. } => observer.on_completed(),
            _ => {}
        }
    }
}

/// Receiver for lesson timer notifications.
///
/// All methods default to no-ops so implementors only pick what they render.
pub trait LessonObserver {
    fn on_stage_changed(&mut self, _stage_id: &str) {}

    fn on_pace_check(&mut self, _is_ahead_of_schedule: bool) {}

    fn on_completed(&mut self) {}

    /// Called for every event, before the specific callback.
    fn on_event(&mut self, _event: &Event) {}
}

/// Observer that keeps every event it sees.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn stage_ids(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::StageChanged { stage_id, .. } => Some(stage_id.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn pace_checks(&self) -> Vec<(u64, bool)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::PaceCheck {
                    elapsed_secs,
                    is_ahead,
                    ..
                } => Some((*elapsed_secs, *is_ahead)),
                _ => None,
            })
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::LessonCompleted { .. }))
            .count()
    }
}

impl LessonObserver for EventLog {
    fn on_event(&mut self, event: &Event) {
        self.events.push(event.clone());
    }
}
