//! # Lesson Flow Core Library
//!
//! This library provides the stage scheduler behind a multi-stage maths
//! lesson. The lesson UI (content, quizzes, practice exercises) is a thin
//! layer that issues commands and renders the events produced here.
//!
//! ## Architecture
//!
//! - **Timer**: a tick-driven state machine that walks an ordered stage
//!   catalog, optionally compressed to a shorter total, and reports pacing
//! - **Session**: binds a timer to a repeating tick source and an observer,
//!   with cancellation on every command that stops the clock
//! - **Config**: TOML configuration and custom stage catalogs
//!
//! ## Key Components
//!
//! - [`LessonFlowTimer`]: Core scheduler state machine
//! - [`LessonSession`]: Tick-source driver
//! - [`StageCatalog`]: Validated stage definitions
//! - [`Config`]: Application configuration management

pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod timer;

pub use config::Config;
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::{Event, EventLog, LessonObserver, StageChangeCause};
pub use session::{LessonSession, ManualTicker, TickHandle, TickSource, TokioTicker};
pub use timer::{
    DurationMode, LessonFlowTimer, SchedulerState, Stage, StageCatalog, StagePosition, TimerState,
};
