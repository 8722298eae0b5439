mod catalog;
mod clock;
mod engine;
pub mod pace;
pub mod resolver;
pub mod scaler;

pub use catalog::{Stage, StageCatalog};
pub use clock::ElapsedClock;
pub use engine::{LessonFlowTimer, SchedulerState, TimerState, DEFAULT_PACE_CHECK_INTERVAL_SECS};
pub use pace::PaceVerdict;
pub use resolver::StagePosition;
pub use scaler::{DurationMode, ScaledDurations};
