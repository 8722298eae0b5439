//! Integration tests for the lesson flow timer and its session driver.
//!
//! Covers the documented lesson scenarios and the stale tick hazard: a tick
//! registered before pause/reset must never move the session afterwards.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use lessonflow_core::{
    ConfigError, DurationMode, Event, EventLog, LessonFlowTimer, LessonSession, ManualTicker,
    Stage, StageCatalog, StageChangeCause, TickHandle, TickSource, TimerState, TokioTicker,
};

fn weighted_catalog(standard_total_min: f64) -> Result<StageCatalog, ConfigError> {
    StageCatalog::new(
        vec![
            Stage::new("a", 5.0),
            Stage::new("b", 10.0),
            Stage::new("c", 15.0),
            Stage::new("d", 15.0),
            Stage::new("e", 10.0),
            Stage::new("f", 10.0),
        ],
        standard_total_min,
        45.0,
    )
}

fn tick_n(timer: &mut LessonFlowTimer, n: u64) -> Vec<Event> {
    (0..n).flat_map(|_| timer.tick()).collect()
}

#[test]
fn test_elapsed_five_minutes_enters_second_stage() {
    let mut timer = LessonFlowTimer::new(weighted_catalog(65.0).unwrap()).unwrap();
    timer.start();
    tick_n(&mut timer, 5 * 60);

    assert_eq!(timer.elapsed_secs(), 300);
    assert_eq!(timer.time_implied_stage_index(), 1);
    assert_eq!(timer.current_stage_index(), 1);
    assert_eq!(timer.current_stage().map(|s| s.id.as_str()), Some("b"));
}

#[test]
fn test_inconsistent_declared_total_is_rejected() {
    // Stages add up to 65 minutes; declaring 60 is a configuration error.
    let err = weighted_catalog(60.0).unwrap_err();
    assert_eq!(
        err,
        ConfigError::TotalMismatch {
            declared_min: 60.0,
            sum_min: 65.0,
        }
    );
}

#[test]
fn test_toggle_mid_session_restarts_in_compressed_mode() {
    let mut timer = LessonFlowTimer::new(weighted_catalog(65.0).unwrap()).unwrap();
    timer.start();
    tick_n(&mut timer, 20 * 60);
    assert_eq!(timer.current_stage_index(), 2);

    timer.toggle_compression_mode();
    assert_eq!(timer.mode(), DurationMode::Compressed);
    assert_eq!(timer.current_stage_index(), 0);
    assert_eq!(timer.remaining_secs(), 45 * 60);
    assert_eq!(timer.elapsed_secs(), 0);
}

#[test]
fn test_jump_ahead_is_not_undone_by_auto_advance() {
    let mut timer = LessonFlowTimer::new(StageCatalog::default()).unwrap();
    timer.start();
    timer.jump_to_stage(3).unwrap();
    assert_eq!(timer.elapsed_secs(), 0);
    assert_eq!(timer.time_implied_stage_index(), 0);

    let events = timer.tick();
    assert!(events.is_empty());
    assert_eq!(timer.current_stage_index(), 3);

    // Time catches up with the jump without moving the index backwards.
    let events = tick_n(&mut timer, 45 * 60);
    assert_eq!(timer.current_stage_index(), 4);
    let auto_changes: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            Event::StageChanged {
                stage_index,
                cause: StageChangeCause::Auto,
                ..
            } => Some(*stage_index),
            _ => None,
        })
        .collect();
    assert_eq!(auto_changes, vec![4]);
}

#[test]
fn test_pace_check_reports_ahead_after_jump() {
    let mut timer = LessonFlowTimer::new(StageCatalog::default())
        .unwrap()
        .with_pace_check_interval(60);
    timer.start();
    timer.jump_to_stage(2).unwrap();
    let events = tick_n(&mut timer, 60);
    match events.last() {
        Some(Event::PaceCheck {
            elapsed_secs,
            stage_index,
            expected_stage_index,
            is_ahead,
            ..
        }) => {
            assert_eq!(*elapsed_secs, 60);
            assert_eq!(*stage_index, 2);
            assert_eq!(*expected_stage_index, 0);
            assert!(*is_ahead);
        }
        other => panic!("Expected PaceCheck, got {other:?}"),
    }
}

#[test]
fn test_final_tick_event_order() {
    let catalog = StageCatalog::from_stages(vec![Stage::new("a", 1.0), Stage::new("b", 1.0)], 1.0)
        .unwrap();
    let mut timer = LessonFlowTimer::new(catalog)
        .unwrap()
        .with_pace_check_interval(120);
    timer.start();
    tick_n(&mut timer, 119);
    let events = timer.tick();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], Event::PaceCheck { elapsed_secs: 120, .. }));
    assert!(matches!(events[1], Event::LessonCompleted { .. }));
    assert_eq!(timer.state(), TimerState::Completed);
}

#[test]
fn test_session_runs_full_lesson_on_manual_ticker() {
    let ticker = ManualTicker::new();
    let timer = LessonFlowTimer::new(StageCatalog::default()).unwrap();
    let mut session = LessonSession::new(timer, ticker.clone(), EventLog::default());

    session.start();
    ticker.advance(3600);

    assert_eq!(session.state(), TimerState::Completed);
    assert_eq!(session.remaining_secs(), 0);
    session.with_observer(|log| {
        assert_eq!(
            log.stage_ids(),
            vec![
                "introduction",
                "guided_practice",
                "independent_practice",
                "quiz",
                "review"
            ]
        );
        assert_eq!(log.pace_checks().len(), 12);
        assert_eq!(log.completed_count(), 1);
    });

    // Extra ticks after completion change nothing.
    ticker.advance(10);
    session.with_observer(|log| assert_eq!(log.completed_count(), 1));
}

// ── Stale tick hazard ────────────────────────────────────────────────

/// Tick source whose handles ignore cancellation.
#[derive(Clone, Default)]
struct LeakyTicker {
    callbacks: Rc<RefCell<Vec<Box<dyn FnMut()>>>>,
}

struct LeakyHandle;

impl TickHandle for LeakyHandle {
    fn cancel(&mut self) {}
}

impl TickSource for LeakyTicker {
    type Handle = LeakyHandle;

    fn schedule_repeating(&mut self, _period: Duration, callback: Box<dyn FnMut()>) -> LeakyHandle {
        self.callbacks.borrow_mut().push(callback);
        LeakyHandle
    }
}

impl LeakyTicker {
    fn fire(&self, times: u32) {
        for _ in 0..times {
            for callback in self.callbacks.borrow_mut().iter_mut() {
                callback();
            }
        }
    }
}

#[test]
fn test_stale_ticks_cannot_advance_paused_or_reset_session() {
    let ticker = LeakyTicker::default();
    let timer = LessonFlowTimer::new(StageCatalog::default()).unwrap();
    let mut session = LessonSession::new(timer, ticker.clone(), EventLog::default());

    session.start();
    ticker.fire(5);
    assert_eq!(session.remaining_secs(), 3595);

    session.pause();
    ticker.fire(5);
    assert_eq!(session.remaining_secs(), 3595);

    // Two callbacks are live now, only the newest one may count.
    session.start();
    ticker.fire(3);
    assert_eq!(session.remaining_secs(), 3592);

    session.reset();
    ticker.fire(5);
    assert_eq!(session.remaining_secs(), 3600);
    assert_eq!(session.state(), TimerState::Idle);

    session.toggle_compression_mode();
    session.start();
    ticker.fire(2);
    assert_eq!(session.remaining_secs(), 2398);
}

#[test]
fn test_cancelled_registration_never_fires() {
    let ticker = ManualTicker::new();
    let timer = LessonFlowTimer::new(StageCatalog::default()).unwrap();
    let mut session = LessonSession::new(timer, ticker.clone(), EventLog::default());

    session.start();
    ticker.advance(30);
    session.reset();
    assert_eq!(ticker.active(), 0);
    ticker.advance(30);

    assert_eq!(session.remaining_secs(), 3600);
    assert_eq!(session.current_stage_index(), 0);
}

// ── Tokio tick source ────────────────────────────────────────────────

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn test_tokio_ticker_drives_session() {
    let local = tokio::task::LocalSet::new();
    local
        .run_until(async {
            let timer = LessonFlowTimer::new(StageCatalog::default()).unwrap();
            let mut session = LessonSession::new(timer, TokioTicker, EventLog::default());

            session.start();
            tokio::time::sleep(Duration::from_millis(3500)).await;
            assert_eq!(session.remaining_secs(), 3597);

            session.pause();
            assert!(!session.is_ticking());
            tokio::time::sleep(Duration::from_secs(5)).await;
            assert_eq!(session.remaining_secs(), 3597);
        })
        .await;
}
