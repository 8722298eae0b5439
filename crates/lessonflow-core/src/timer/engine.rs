//! Lesson flow timer.
//!
//! The timer is a tick-driven state machine. It does not use internal
//! threads or read the wall clock - the caller invokes `tick()` once per
//! elapsed second (see [`crate::session`] for a driver that does this).
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused -> Completed
//!   ^__________ reset / toggle_compression_mode (from any state)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut timer = LessonFlowTimer::new(StageCatalog::default())?;
//! timer.start();
//! // Once per second:
//! for event in timer.tick() { /* render */ }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::{Stage, StageCatalog};
use super::clock::ElapsedClock;
use super::pace;
use super::resolver::{self, StagePosition};
use super::scaler::{self, DurationMode, ScaledDurations};
use crate::error::{ConfigError, ValidationError};
use crate::events::{Event, StageChangeCause};

/// Pace notifications fire every five minutes of lesson time by default.
pub const DEFAULT_PACE_CHECK_INTERVAL_SECS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Everything that changes during a lesson session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerState {
    pub state: TimerState,
    pub clock: ElapsedClock,
    /// Authoritative stage. Written by auto-advance and by manual jumps.
    pub current_stage_index: usize,
    pub mode: DurationMode,
    /// Elapsed second of the last pace notification.
    pub last_pace_check_elapsed_secs: Option<u64>,
}

impl SchedulerState {
    fn initial(mode: DurationMode, total_secs: u64) -> Self {
        Self {
            state: TimerState::Idle,
            clock: ElapsedClock::new(total_secs),
            current_stage_index: 0,
            mode,
            last_pace_check_elapsed_secs: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }
}

/// Core scheduler for one lesson session.
#[derive(Debug, Clone)]
pub struct LessonFlowTimer {
    catalog: StageCatalog,
    standard: ScaledDurations,
    compressed: ScaledDurations,
    pace_check_interval_secs: u64,
    state: SchedulerState,
    /// Bumped by every transition that invalidates ticks scheduled before it.
    epoch: u64,
}

impl LessonFlowTimer {
    /// Create an idle timer in standard mode.
    ///
    /// Fails if the catalog is malformed; a timer never exists for a catalog
    /// that could tick into an undefined stage.
    pub fn new(catalog: StageCatalog) -> Result<Self, ConfigError> {
        Self::with_mode(catalog, DurationMode::Standard)
    }

    pub fn with_mode(catalog: StageCatalog, mode: DurationMode) -> Result<Self, ConfigError> {
        catalog.validate()?;
        let standard = scaler::scale(&catalog, DurationMode::Standard)?;
        let compressed = scaler::scale(&catalog, DurationMode::Compressed)?;
        let total_secs = match mode {
            DurationMode::Standard => standard.total_secs,
            DurationMode::Compressed => compressed.total_secs,
        };
        Ok(Self {
            catalog,
            standard,
            compressed,
            pace_check_interval_secs: DEFAULT_PACE_CHECK_INTERVAL_SECS,
            state: SchedulerState::initial(mode, total_secs),
            epoch: 0,
        })
    }

    /// Builder-style override of the pace check interval. Zero disables checks.
    pub fn with_pace_check_interval(mut self, secs: u64) -> Self {
        self.pace_check_interval_secs = secs;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn scheduler_state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn mode(&self) -> DurationMode {
        self.state.mode
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn catalog(&self) -> &StageCatalog {
        &self.catalog
    }

    pub fn pace_check_interval_secs(&self) -> u64 {
        self.pace_check_interval_secs
    }

    /// Scaled durations for the active mode.
    pub fn scaled(&self) -> &ScaledDurations {
        match self.state.mode {
            DurationMode::Standard => &self.standard,
            DurationMode::Compressed => &self.compressed,
        }
    }

    pub fn total_secs(&self) -> u64 {
        self.state.clock.total_secs()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.state.clock.remaining_secs()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.state.clock.elapsed_secs()
    }

    pub fn current_stage_index(&self) -> usize {
        self.state.current_stage_index
    }

    pub fn current_stage(&self) -> Option<&Stage> {
        self.catalog.get(self.state.current_stage_index)
    }

    /// Stage position implied by elapsed time alone.
    pub fn time_implied_position(&self) -> StagePosition {
        self.stage_at(self.elapsed_secs())
    }

    pub fn time_implied_stage_index(&self) -> usize {
        self.time_implied_position().stage_index
    }

    /// Where `elapsed_secs` falls in the active mode's schedule.
    pub fn stage_at(&self, elapsed_secs: u64) -> StagePosition {
        resolver::resolve(elapsed_secs as f64, &self.scaled().per_stage_secs)
    }

    /// 0.0 .. 1.0 progress within the time-implied stage.
    pub fn stage_progress(&self) -> f64 {
        self.time_implied_position().stage_progress
    }

    /// Whole seconds left until elapsed time leaves the time-implied stage.
    pub fn stage_remaining_secs(&self) -> u64 {
        let implied = self.time_implied_stage_index();
        let stage_end = self.scaled().cumulative_secs(implied + 1);
        let left = (stage_end - self.elapsed_secs() as f64).ceil().max(0.0) as u64;
        left.min(self.remaining_secs())
    }

    pub fn is_ahead_of_schedule(&self) -> bool {
        pace::evaluate(self.state.current_stage_index, self.time_implied_stage_index()).is_ahead
    }

    /// 0.0 .. 100.0 progress across the whole lesson.
    pub fn lesson_progress_pct(&self) -> f64 {
        let total = self.total_secs();
        if total == 0 {
            return 100.0;
        }
        (self.elapsed_secs() as f64 / total as f64 * 100.0).min(100.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let stage = self.current_stage();
        let position = self.time_implied_position();
        Event::StateSnapshot {
            state: self.state.state,
            mode: self.state.mode,
            stage_index: self.state.current_stage_index,
            stage_id: stage.map(|s| s.id.clone()).unwrap_or_default(),
            stage_label: stage.map(|s| s.label.clone()).unwrap_or_default(),
            expected_stage_index: position.stage_index,
            is_ahead: pace::evaluate(self.state.current_stage_index, position.stage_index).is_ahead,
            remaining_secs: self.remaining_secs(),
            total_secs: self.total_secs(),
            stage_progress: position.stage_progress,
            lesson_progress_pct: self.lesson_progress_pct(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        match self.state.state {
            TimerState::Idle => {
                self.epoch += 1;
                self.state.state = TimerState::Running;
                info!(
                    mode = ?self.state.mode,
                    total_secs = self.total_secs(),
                    "lesson started"
                );
                Some(Event::TimerStarted {
                    stage_index: self.state.current_stage_index,
                    stage_id: self.stage_id(self.state.current_stage_index),
                    mode: self.state.mode,
                    total_secs: self.total_secs(),
                    at: Utc::now(),
                })
            }
            TimerState::Paused => {
                self.epoch += 1;
                self.state.state = TimerState::Running;
                info!(remaining_secs = self.remaining_secs(), "lesson resumed");
                Some(Event::TimerResumed {
                    remaining_secs: self.remaining_secs(),
                    at: Utc::now(),
                })
            }
            TimerState::Running | TimerState::Completed => None,
        }
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state.state != TimerState::Running {
            return None;
        }
        self.epoch += 1;
        self.state.state = TimerState::Paused;
        info!(remaining_secs = self.remaining_secs(), "lesson paused");
        Some(Event::TimerPaused {
            remaining_secs: self.remaining_secs(),
            at: Utc::now(),
        })
    }

    /// Back to a fresh idle session in the current mode.
    pub fn reset(&mut self) -> Option<Event> {
        self.reinitialize(self.state.mode);
        info!(mode = ?self.state.mode, "lesson reset");
        Some(Event::TimerReset {
            mode: self.state.mode,
            total_secs: self.total_secs(),
            at: Utc::now(),
        })
    }

    /// Switch between standard and compressed durations.
    ///
    /// This is a coarse reset into the other mode: the session returns to
    /// `Idle` at the first stage with the new total, whatever state it was in.
    pub fn toggle_compression_mode(&mut self) -> Option<Event> {
        let mode = self.state.mode.toggled();
        self.reinitialize(mode);
        info!(mode = ?mode, total_secs = self.total_secs(), "duration mode toggled");
        Some(Event::ModeToggled {
            mode,
            total_secs: self.total_secs(),
            at: Utc::now(),
        })
    }

    /// Commit to `index` regardless of elapsed time. The clock is untouched.
    pub fn jump_to_stage(&mut self, index: usize) -> Result<Option<Event>, ValidationError> {
        let len = self.catalog.len();
        if index >= len {
            warn!(index, len, "jump outside the catalog rejected");
            return Err(ValidationError::OutOfBounds {
                collection: "stages".into(),
                index,
                len,
            });
        }
        Ok(self.commit_stage(index, StageChangeCause::Manual))
    }

    pub fn next_stage(&mut self) -> Option<Event> {
        let next = self.state.current_stage_index + 1;
        if next >= self.catalog.len() {
            return None;
        }
        self.commit_stage(next, StageChangeCause::Manual)
    }

    pub fn previous_stage(&mut self) -> Option<Event> {
        let prev = self.state.current_stage_index.checked_sub(1)?;
        self.commit_stage(prev, StageChangeCause::Manual)
    }

    /// Advance the lesson by one second.
    ///
    /// Events come out in a fixed order: stage change, pace check, completion.
    /// Does nothing unless the timer is running.
    pub fn tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        if self.state.state != TimerState::Running || !self.state.clock.tick() {
            return events;
        }

        let elapsed = self.elapsed_secs();
        let implied = self.time_implied_stage_index();

        // Auto-advance only moves forward; a backward jump stays put until
        // elapsed time catches up.
        if implied > self.state.current_stage_index {
            events.extend(self.commit_stage(implied, StageChangeCause::Auto));
        }

        if pace::should_fire(
            elapsed,
            self.state.last_pace_check_elapsed_secs,
            self.pace_check_interval_secs,
        ) {
            let verdict = pace::evaluate(self.state.current_stage_index, implied);
            self.state.last_pace_check_elapsed_secs = Some(elapsed);
            debug!(
                elapsed_secs = elapsed,
                stage_index = self.state.current_stage_index,
                expected_stage_index = implied,
                is_ahead = verdict.is_ahead,
                "pace check"
            );
            events.push(Event::PaceCheck {
                elapsed_secs: elapsed,
                stage_index: self.state.current_stage_index,
                expected_stage_index: implied,
                is_ahead: verdict.is_ahead,
                at: Utc::now(),
            });
        }

        if self.state.clock.is_expired() {
            self.epoch += 1;
            self.state.state = TimerState::Completed;
            info!(elapsed_secs = elapsed, "lesson completed");
            events.push(Event::LessonCompleted {
                elapsed_secs: elapsed,
                stage_index: self.state.current_stage_index,
                at: Utc::now(),
            });
        }

        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn reinitialize(&mut self, mode: DurationMode) {
        let total_secs = match mode {
            DurationMode::Standard => self.standard.total_secs,
            DurationMode::Compressed => self.compressed.total_secs,
        };
        self.epoch += 1;
        self.state = SchedulerState::initial(mode, total_secs);
    }

    fn commit_stage(&mut self, index: usize, cause: StageChangeCause) -> Option<Event> {
        let from = self.state.current_stage_index;
        if from == index {
            return None;
        }
        self.state.current_stage_index = index;
        debug!(from, to = index, ?cause, "stage changed");
        Some(Event::StageChanged {
            from_stage: from,
            stage_index: index,
            stage_id: self.stage_id(index),
            cause,
            at: Utc::now(),
        })
    }

    fn stage_id(&self, index: usize) -> String {
        self.catalog
            .get(index)
            .map(|s| s.id.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer() -> LessonFlowTimer {
        LessonFlowTimer::new(StageCatalog::default()).unwrap()
    }

    fn run_for(timer: &mut LessonFlowTimer, secs: u64) -> Vec<Event> {
        (0..secs).flat_map(|_| timer.tick()).collect()
    }

    #[test]
    fn start_pause_resume() {
        let mut timer = timer();
        assert_eq!(timer.state(), TimerState::Idle);

        assert!(matches!(timer.start(), Some(Event::TimerStarted { .. })));
        assert_eq!(timer.state(), TimerState::Running);
        assert!(timer.start().is_none());

        assert!(matches!(timer.pause(), Some(Event::TimerPaused { .. })));
        assert_eq!(timer.state(), TimerState::Paused);
        assert!(timer.pause().is_none());

        assert!(matches!(timer.start(), Some(Event::TimerResumed { .. })));
        assert_eq!(timer.state(), TimerState::Running);
    }

    #[test]
    fn idle_timer_does_not_tick() {
        let mut timer = timer();
        assert!(timer.tick().is_empty());
        assert_eq!(timer.remaining_secs(), 3600);
    }

    #[test]
    fn paused_timer_does_not_tick() {
        let mut timer = timer();
        timer.start();
        timer.tick();
        timer.pause();
        assert!(run_for(&mut timer, 10).is_empty());
        assert_eq!(timer.elapsed_secs(), 1);
    }

    #[test]
    fn timer_state_alone_gates_the_clock() {
        let mut timer = timer();
        timer.start();
        timer.tick();
        assert_eq!(timer.remaining_secs(), 3599);

        timer.pause();
        assert!(timer.tick().is_empty());
        assert_eq!(timer.remaining_secs(), 3599);
        timer.start();
        timer.tick();
        assert_eq!(timer.remaining_secs(), 3598);
    }

    #[test]
    fn auto_advance_at_stage_boundary() {
        let mut timer = timer();
        timer.start();
        let events = run_for(&mut timer, 299);
        assert!(events.is_empty());
        assert_eq!(timer.current_stage_index(), 0);

        let events = timer.tick();
        assert_eq!(timer.current_stage_index(), 1);
        match &events[0] {
            Event::StageChanged {
                from_stage,
                stage_id,
                cause,
                ..
            } => {
                assert_eq!(*from_stage, 0);
                assert_eq!(stage_id, "introduction");
                assert_eq!(*cause, StageChangeCause::Auto);
            }
            other => panic!("Expected StageChanged, got {other:?}"),
        }
        // 300 s is also the first pace check.
        assert!(matches!(events[1], Event::PaceCheck { is_ahead: false, .. }));
    }

    #[test]
    fn completes_after_total_seconds() {
        let mut timer = timer();
        timer.start();
        let events = run_for(&mut timer, 3600);
        assert_eq!(timer.state(), TimerState::Completed);
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(timer.current_stage_index(), 5);
        assert!(matches!(events.last(), Some(Event::LessonCompleted { .. })));
        assert!(timer.tick().is_empty());
        assert!(timer.start().is_none());
    }

    #[test]
    fn jump_ahead_survives_next_tick() {
        let mut timer = timer();
        timer.start();
        let event = timer.jump_to_stage(3).unwrap();
        assert!(matches!(
            event,
            Some(Event::StageChanged {
                cause: StageChangeCause::Manual,
                ..
            })
        ));
        assert_eq!(timer.elapsed_secs(), 0);
        timer.tick();
        assert_eq!(timer.current_stage_index(), 3);
        assert!(timer.is_ahead_of_schedule());
    }

    #[test]
    fn backward_jump_resyncs_on_next_tick() {
        let mut timer = timer();
        timer.start();
        run_for(&mut timer, 400);
        assert_eq!(timer.current_stage_index(), 1);
        timer.jump_to_stage(0).unwrap();
        timer.tick();
        // Elapsed time is past stage 0, so auto-advance re-synchronizes.
        assert_eq!(timer.current_stage_index(), 1);
    }

    #[test]
    fn jump_out_of_bounds_rejected() {
        let mut timer = timer();
        let err = timer.jump_to_stage(6).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfBounds {
                collection: "stages".into(),
                index: 6,
                len: 6,
            }
        );
        assert_eq!(timer.current_stage_index(), 0);
    }

    #[test]
    fn jump_to_current_stage_is_silent() {
        let mut timer = timer();
        assert_eq!(timer.jump_to_stage(0).unwrap(), None);
    }

    #[test]
    fn next_and_previous_stage() {
        let mut timer = timer();
        assert!(timer.previous_stage().is_none());
        timer.next_stage();
        timer.next_stage();
        assert_eq!(timer.current_stage_index(), 2);
        timer.previous_stage();
        assert_eq!(timer.current_stage_index(), 1);
        timer.jump_to_stage(5).unwrap();
        assert!(timer.next_stage().is_none());
    }

    #[test]
    fn toggle_mid_session_discards_progress() {
        let mut timer = timer();
        timer.start();
        run_for(&mut timer, 1000);
        assert!(timer.current_stage_index() > 0);

        let event = timer.toggle_compression_mode();
        assert!(matches!(
            event,
            Some(Event::ModeToggled {
                mode: DurationMode::Compressed,
                total_secs: 2400,
                ..
            })
        ));
        assert_eq!(timer.current_stage_index(), 0);
        assert_eq!(timer.remaining_secs(), 2400);
        assert_eq!(timer.state(), TimerState::Idle);
        assert!(timer.tick().is_empty());
    }

    #[test]
    fn reset_matches_fresh_timer() {
        let mut timer = LessonFlowTimer::with_mode(StageCatalog::default(), DurationMode::Compressed)
            .unwrap();
        timer.start();
        run_for(&mut timer, 700);
        timer.jump_to_stage(4).unwrap();
        timer.pause();
        timer.reset();

        let fresh = LessonFlowTimer::with_mode(StageCatalog::default(), DurationMode::Compressed)
            .unwrap();
        assert_eq!(timer.scheduler_state(), fresh.scheduler_state());
    }

    #[test]
    fn commands_bump_epoch() {
        let mut timer = timer();
        let e0 = timer.epoch();
        timer.start();
        let e1 = timer.epoch();
        timer.pause();
        let e2 = timer.epoch();
        timer.reset();
        assert!(e0 < e1 && e1 < e2 && e2 < timer.epoch());
    }

    #[test]
    fn stage_remaining_counts_down() {
        let mut timer = timer();
        timer.start();
        assert_eq!(timer.stage_remaining_secs(), 300);
        run_for(&mut timer, 100);
        assert_eq!(timer.stage_remaining_secs(), 200);
        assert!((timer.stage_progress() - 100.0 / 300.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_returns_valid_event() {
        let timer = timer();
        match timer.snapshot() {
            Event::StateSnapshot {
                state,
                stage_index,
                stage_id,
                remaining_secs,
                lesson_progress_pct,
                ..
            } => {
                assert_eq!(state, TimerState::Idle);
                assert_eq!(stage_index, 0);
                assert_eq!(stage_id, "warm_up");
                assert_eq!(remaining_secs, 3600);
                assert_eq!(lesson_progress_pct, 0.0);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn malformed_catalog_prevents_construction() {
        let catalog = StageCatalog {
            standard_total_min: 60.0,
            compressed_total_min: 40.0,
            stages: Vec::new(),
        };
        assert_eq!(
            LessonFlowTimer::new(catalog).unwrap_err(),
            ConfigError::EmptyCatalog
        );
    }
}
