//! Maps elapsed lesson time onto a stage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagePosition {
    pub stage_index: usize,
    /// 0.0 .. 1.0 progress within the stage.
    pub stage_progress: f64,
}

/// Find the stage that `elapsed_secs` falls into.
///
/// Zero-length stages never contain a point in time but still count toward
/// the offset of the stages after them. Once the lesson is over the last
/// stage is reported as fully done.
pub fn resolve(elapsed_secs: f64, per_stage_secs: &[f64]) -> StagePosition {
    let Some(last) = per_stage_secs.len().checked_sub(1) else {
        return StagePosition {
            stage_index: 0,
            stage_progress: 0.0,
        };
    };

    let total: f64 = per_stage_secs.iter().sum();
    if elapsed_secs >= total {
        return StagePosition {
            stage_index: last,
            stage_progress: 1.0,
        };
    }

    let mut start = 0.0;
    for (index, &duration) in per_stage_secs.iter().enumerate() {
        let end = start + duration;
        if duration > 0.0 && elapsed_secs >= start && elapsed_secs < end {
            return StagePosition {
                stage_index: index,
                stage_progress: local_progress(elapsed_secs, start, duration),
            };
        }
        start = end;
    }

    // Only reachable through float drift right at the end.
    StagePosition {
        stage_index: last,
        stage_progress: 1.0,
    }
}

/// `duration` must be positive.
fn local_progress(elapsed_secs: f64, start: f64, duration: f64) -> f64 {
    ((elapsed_secs - start) / duration).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPANS: [f64; 6] = [300.0, 600.0, 900.0, 900.0, 600.0, 600.0];

    #[test]
    fn start_of_lesson_is_first_stage() {
        let pos = resolve(0.0, &SPANS);
        assert_eq!(pos.stage_index, 0);
        assert_eq!(pos.stage_progress, 0.0);
    }

    #[test]
    fn boundary_belongs_to_next_stage() {
        let pos = resolve(300.0, &SPANS);
        assert_eq!(pos.stage_index, 1);
        assert_eq!(pos.stage_progress, 0.0);
    }

    #[test]
    fn progress_within_stage() {
        let pos = resolve(600.0, &SPANS);
        assert_eq!(pos.stage_index, 1);
        assert!((pos.stage_progress - 0.5).abs() < 1e-9);
    }

    #[test]
    fn overrun_clamps_to_last_stage() {
        let pos = resolve(10_000.0, &SPANS);
        assert_eq!(pos.stage_index, 5);
        assert_eq!(pos.stage_progress, 1.0);
    }

    #[test]
    fn zero_length_stage_is_skipped() {
        let spans = [60.0, 0.0, 60.0];
        let pos = resolve(60.0, &spans);
        assert_eq!(pos.stage_index, 2);
        assert_eq!(pos.stage_progress, 0.0);
        assert!(!resolve(30.0, &spans).stage_progress.is_nan());
    }

    #[test]
    fn all_zero_stages_never_nan() {
        let pos = resolve(0.0, &[0.0, 0.0]);
        assert_eq!(pos.stage_index, 1);
        assert_eq!(pos.stage_progress, 1.0);
    }

    #[test]
    fn empty_spans_resolve_to_origin() {
        let pos = resolve(42.0, &[]);
        assert_eq!(pos.stage_index, 0);
        assert_eq!(pos.stage_progress, 0.0);
    }
}
