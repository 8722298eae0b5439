//! Drives a [`LessonFlowTimer`] from a repeating tick source.
//!
//! A session owns the timer, an observer and at most one live tick
//! registration. Every command that stops the clock cancels that
//! registration. Each registration also remembers the timer epoch it was
//! created under; a callback from an older epoch is dropped, so a tick
//! source that fails to cancel in time can never advance a paused, reset
//! or toggled session.
//!
//! Everything here is single-threaded (`Rc<RefCell<_>>`).

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::ValidationError;
use crate::events::{Event, LessonObserver};
use crate::timer::{DurationMode, LessonFlowTimer, TimerState};

/// Lesson time advances one second per tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Cancellation handle for a repeating registration.
pub trait TickHandle {
    fn cancel(&mut self);
}

/// Something that can call back periodically.
pub trait TickSource {
    type Handle: TickHandle;

    fn schedule_repeating(&mut self, period: Duration, callback: Box<dyn FnMut()>) -> Self::Handle;
}

pub struct LessonSession<S: TickSource, O: LessonObserver + 'static> {
    timer: Rc<RefCell<LessonFlowTimer>>,
    observer: Rc<RefCell<O>>,
    ticks: S,
    handle: Option<S::Handle>,
    period: Duration,
}

impl<S: TickSource, O: LessonObserver + 'static> LessonSession<S, O> {
    pub fn new(timer: LessonFlowTimer, ticks: S, observer: O) -> Self {
        Self {
            timer: Rc::new(RefCell::new(timer)),
            observer: Rc::new(RefCell::new(observer)),
            ticks,
            handle: None,
            period: TICK_PERIOD,
        }
    }

    /// Real time between ticks. Lesson time still moves one second per tick.
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) {
        let event = self.timer.borrow_mut().start();
        if event.is_some() {
            self.schedule_ticks();
        }
        self.emit(event);
    }

    pub fn pause(&mut self) {
        self.cancel_ticks();
        let event = self.timer.borrow_mut().pause();
        self.emit(event);
    }

    /// Pause when running, resume when paused.
    pub fn toggle_pause(&mut self) {
        if self.state() == TimerState::Running {
            self.pause();
        } else {
            self.start();
        }
    }

    pub fn reset(&mut self) {
        self.cancel_ticks();
        let event = self.timer.borrow_mut().reset();
        self.emit(event);
    }

    pub fn toggle_compression_mode(&mut self) {
        self.cancel_ticks();
        let event = self.timer.borrow_mut().toggle_compression_mode();
        self.emit(event);
    }

    pub fn jump_to_stage(&mut self, index: usize) -> Result<(), ValidationError> {
        let event = self.timer.borrow_mut().jump_to_stage(index)?;
        self.emit(event);
        Ok(())
    }

    pub fn next_stage(&mut self) {
        let event = self.timer.borrow_mut().next_stage();
        self.emit(event);
    }

    pub fn previous_stage(&mut self) {
        let event = self.timer.borrow_mut().previous_stage();
        self.emit(event);
    }

    /// Drop the registration once the lesson has finished on its own.
    ///
    /// Ticks after completion are already no-ops; this only releases the
    /// tick source.
    pub fn reap_completed(&mut self) -> bool {
        if self.state() == TimerState::Completed {
            self.cancel_ticks();
            return true;
        }
        false
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.timer.borrow().state()
    }

    pub fn mode(&self) -> DurationMode {
        self.timer.borrow().mode()
    }

    pub fn remaining_secs(&self) -> u64 {
        self.timer.borrow().remaining_secs()
    }

    pub fn current_stage_index(&self) -> usize {
        self.timer.borrow().current_stage_index()
    }

    pub fn stage_progress(&self) -> f64 {
        self.timer.borrow().stage_progress()
    }

    pub fn snapshot(&self) -> Event {
        self.timer.borrow().snapshot()
    }

    pub fn is_ticking(&self) -> bool {
        self.handle.is_some()
    }

    /// Read-only access to the timer for anything the shortcuts above miss.
    pub fn with_timer<R>(&self, f: impl FnOnce(&LessonFlowTimer) -> R) -> R {
        f(&self.timer.borrow())
    }

    pub fn with_observer<R>(&self, f: impl FnOnce(&O) -> R) -> R {
        f(&self.observer.borrow())
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn emit(&self, event: Option<Event>) {
        if let Some(event) = event {
            event.dispatch(&mut *self.observer.borrow_mut());
        }
    }

    /// Register a repeating tick stamped with the timer's current epoch.
    fn schedule_ticks(&mut self) {
        self.cancel_ticks();
        let epoch = self.timer.borrow().epoch();

        let timer = Rc::clone(&self.timer);
        let observer = Rc::clone(&self.observer);
        let callback = Box::new(move || {
            let events = {
                let Ok(mut timer) = timer.try_borrow_mut() else {
                    warn!("tick re-entered while the timer was borrowed; skipped");
                    return;
                };
                if timer.epoch() != epoch {
                    warn!(stale = epoch, current = timer.epoch(), "stale tick ignored");
                    return;
                }
                timer.tick()
            };
            let mut observer = observer.borrow_mut();
            for event in &events {
                event.dispatch(&mut *observer);
            }
        });
        self.handle = Some(self.ticks.schedule_repeating(self.period, callback));
    }

    fn cancel_ticks(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl<S: TickSource, O: LessonObserver + 'static> Drop for LessonSession<S, O> {
    fn drop(&mut self) {
        self.cancel_ticks();
    }
}

// ── Manual tick source ───────────────────────────────────────────────

type Callback = Box<dyn FnMut()>;

#[derive(Default)]
struct ManualTickerInner {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
    cancelled: HashSet<u64>,
}

/// Deterministic tick source: nothing fires until `advance` is called.
///
/// Clones share the same registrations, so a test can keep one clone and
/// hand the other to a session.
#[derive(Clone, Default)]
pub struct ManualTicker {
    inner: Rc<RefCell<ManualTickerInner>>,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire every live registration `ticks` times.
    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            let mut callbacks = std::mem::take(&mut self.inner.borrow_mut().callbacks);
            for (id, callback) in callbacks.iter_mut() {
                if self.inner.borrow().cancelled.contains(id) {
                    continue;
                }
                callback();
            }

            let mut inner = self.inner.borrow_mut();
            let cancelled = std::mem::take(&mut inner.cancelled);
            callbacks.retain(|(id, _)| !cancelled.contains(id));
            let added = std::mem::take(&mut inner.callbacks);
            callbacks.extend(added);
            inner.callbacks = callbacks;
        }
    }

    /// Number of live registrations.
    pub fn active(&self) -> usize {
        let inner = self.inner.borrow();
        inner
            .callbacks
            .iter()
            .filter(|(id, _)| !inner.cancelled.contains(id))
            .count()
    }
}

pub struct ManualTickHandle {
    id: u64,
    inner: Rc<RefCell<ManualTickerInner>>,
}

impl TickHandle for ManualTickHandle {
    fn cancel(&mut self) {
        let mut inner = self.inner.borrow_mut();
        let id = self.id;
        inner.callbacks.retain(|(cb_id, _)| *cb_id != id);
        // Covers cancellation from inside a callback while `advance` holds
        // the list.
        inner.cancelled.insert(id);
    }
}

impl TickSource for ManualTicker {
    type Handle = ManualTickHandle;

    fn schedule_repeating(&mut self, _period: Duration, callback: Callback) -> ManualTickHandle {
        let mut inner = self.inner.borrow_mut();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.callbacks.push((id, callback));
        ManualTickHandle {
            id,
            inner: Rc::clone(&self.inner),
        }
    }
}

// ── Tokio tick source ────────────────────────────────────────────────

/// Tick source backed by `tokio::time::interval`.
///
/// Callbacks are not `Send`, so registrations are spawned with
/// `spawn_local`; the session must live inside a `tokio::task::LocalSet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioTicker;

pub struct TokioTickHandle {
    task: Option<JoinHandle<()>>,
}

impl TickHandle for TokioTickHandle {
    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for TokioTickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl TickSource for TokioTicker {
    type Handle = TokioTickHandle;

    fn schedule_repeating(&mut self, period: Duration, mut callback: Callback) -> TokioTickHandle {
        let task = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; lesson time starts one
            // period later.
            interval.tick().await;
            loop {
                interval.tick().await;
                callback();
            }
        });
        TokioTickHandle { task: Some(task) }
    }
}
