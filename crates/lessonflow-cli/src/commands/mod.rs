pub mod catalog;
pub mod config;
pub mod run;
pub mod simulate;

use std::path::Path;

use clap::ValueEnum;
use lessonflow_core::{Config, DurationMode, Event, LessonFlowTimer, LessonObserver};

/// Prints every event as one line of JSON on stdout.
pub struct JsonLinePrinter;

impl LessonObserver for JsonLinePrinter {
    fn on_event(&mut self, event: &Event) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
        }
    }
}

/// Lesson length selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Standard,
    Compressed,
}

impl ModeArg {
    /// Combine `--mode` with the `--compressed` shorthand. `None` defers to the config.
    pub fn select(mode: Option<ModeArg>, compressed: bool) -> Option<DurationMode> {
        match (mode, compressed) {
            (Some(ModeArg::Standard), _) => Some(DurationMode::Standard),
            (Some(ModeArg::Compressed), _) | (None, true) => Some(DurationMode::Compressed),
            (None, false) => None,
        }
    }
}

/// Build a timer from the config file, with command-line overrides.
pub fn build_timer(
    config_path: &Path,
    mode: Option<DurationMode>,
    pace_interval: Option<u64>,
) -> Result<(Config, LessonFlowTimer), Box<dyn std::error::Error>> {
    let config = Config::load_from(config_path)?;
    let mode = mode.unwrap_or_else(|| config.mode());
    let interval = pace_interval.unwrap_or(config.timer.pace_check_interval_secs);
    let timer = LessonFlowTimer::with_mode(config.catalog(), mode)?.with_pace_check_interval(interval);
    Ok((config, timer))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_flag_overrides_shorthand_and_config() {
        assert_eq!(ModeArg::select(None, false), None);
        assert_eq!(ModeArg::select(None, true), Some(DurationMode::Compressed));
        assert_eq!(
            ModeArg::select(Some(ModeArg::Standard), false),
            Some(DurationMode::Standard)
        );
        assert_eq!(
            ModeArg::select(Some(ModeArg::Compressed), false),
            Some(DurationMode::Compressed)
        );
    }
}
