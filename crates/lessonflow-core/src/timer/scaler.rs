//! Proportional rescaling of stage durations.
//!
//! Every stage keeps its share of the lesson; only the lesson length changes
//! between the standard and the compressed mode.

use serde::{Deserialize, Serialize};

use super::catalog::StageCatalog;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationMode {
    #[default]
    Standard,
    Compressed,
}

impl DurationMode {
    pub fn toggled(self) -> Self {
        match self {
            DurationMode::Standard => DurationMode::Compressed,
            DurationMode::Compressed => DurationMode::Standard,
        }
    }

    pub fn is_compressed(self) -> bool {
        self == DurationMode::Compressed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledDurations {
    pub per_stage_secs: Vec<f64>,
    pub total_secs: u64,
}

impl ScaledDurations {
    /// Start offset of `stage_index` in seconds.
    pub fn cumulative_secs(&self, stage_index: usize) -> f64 {
        self.per_stage_secs.iter().take(stage_index).sum()
    }
}

/// Scale every stage of `catalog` to the total selected by `mode`.
pub fn scale(catalog: &StageCatalog, mode: DurationMode) -> Result<ScaledDurations, ConfigError> {
    if catalog.stages.is_empty() {
        return Err(ConfigError::EmptyCatalog);
    }
    if !catalog.standard_total_min.is_finite() || catalog.standard_total_min <= 0.0 {
        return Err(ConfigError::TotalMismatch {
            declared_min: catalog.standard_total_min,
            sum_min: catalog.nominal_sum_min(),
        });
    }

    let selected_min = match mode {
        DurationMode::Standard => catalog.standard_total_min,
        DurationMode::Compressed => catalog.compressed_total_min,
    };
    let ratio = selected_min / catalog.standard_total_min;

    let per_stage_secs = catalog
        .stages
        .iter()
        .map(|s| s.duration_min * ratio * 60.0)
        .collect();

    Ok(ScaledDurations {
        per_stage_secs,
        total_secs: (selected_min * 60.0).round().max(0.0) as u64,
    })
}
