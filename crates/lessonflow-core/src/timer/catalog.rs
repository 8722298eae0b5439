use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result as CoreResult};

/// Slack allowed when comparing the stage sum against the declared total.
const TOTAL_TOLERANCE_MIN: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: String,
    /// Share of the standard total, in minutes.
    pub duration_min: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub description: String,
}

impl Stage {
    pub fn new(id: impl Into<String>, duration_min: f64) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            duration_min,
            description: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Ordered stage definitions plus the two catalog-level totals.
///
/// A catalog obtained through [`StageCatalog::new`] is always valid; one
/// deserialized from a config file must go through [`StageCatalog::validate`]
/// before it reaches a scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageCatalog {
    pub standard_total_min: f64,
    pub compressed_total_min: f64,
    pub stages: Vec<Stage>,
}

impl StageCatalog {
    pub fn new(
        stages: Vec<Stage>,
        standard_total_min: f64,
        compressed_total_min: f64,
    ) -> Result<Self, ConfigError> {
        let catalog = Self {
            standard_total_min,
            compressed_total_min,
            stages,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Build a catalog whose standard total is the sum of its stages.
    pub fn from_stages(stages: Vec<Stage>, compressed_total_min: f64) -> Result<Self, ConfigError> {
        let total = stages.iter().map(|s| s.duration_min).sum();
        Self::new(stages, total, compressed_total_min)
    }

    /// The built-in maths lesson: one hour standard, forty minutes compressed.
    pub fn default_lesson() -> Self {
        Self {
            standard_total_min: 60.0,
            compressed_total_min: 40.0,
            stages: vec![
                Stage::new("warm_up", 5.0)
                    .with_label("Warm Up")
                    .with_description("Mental arithmetic to get going"),
                Stage::new("introduction", 10.0)
                    .with_label("Introduction")
                    .with_description("New concept with worked examples"),
                Stage::new("guided_practice", 15.0)
                    .with_label("Guided Practice")
                    .with_description("Exercises solved together step by step"),
                Stage::new("independent_practice", 15.0)
                    .with_label("Independent Practice")
                    .with_description("Drag-and-drop and free exercises"),
                Stage::new("quiz", 10.0)
                    .with_label("Quiz")
                    .with_description("Short scored check of understanding"),
                Stage::new("review", 5.0)
                    .with_label("Review")
                    .with_description("Recap and preview of the next lesson"),
            ],
        }
    }

    /// Read and validate a standalone catalog TOML file.
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: StageCatalog = toml::from_str(&content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for (position, stage) in self.stages.iter().enumerate() {
            if stage.id.trim().is_empty() {
                return Err(ConfigError::EmptyStageId { position });
            }
            if !seen.insert(stage.id.as_str()) {
                return Err(ConfigError::DuplicateStageId {
                    id: stage.id.clone(),
                });
            }
            if !stage.duration_min.is_finite() || stage.duration_min <= 0.0 {
                return Err(ConfigError::NonPositiveDuration {
                    id: stage.id.clone(),
                    duration_min: stage.duration_min,
                });
            }
        }

        let sum = self.nominal_sum_min();
        if (sum - self.standard_total_min).abs() > TOTAL_TOLERANCE_MIN {
            return Err(ConfigError::TotalMismatch {
                declared_min: self.standard_total_min,
                sum_min: sum,
            });
        }

        if !self.compressed_total_min.is_finite()
            || self.compressed_total_min * 60.0 < 1.0
            || self.compressed_total_min >= self.standard_total_min
        {
            return Err(ConfigError::InvalidCompressedTotal {
                standard_min: self.standard_total_min,
                compressed_min: self.compressed_total_min,
            });
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    pub fn nominal_sum_min(&self) -> f64 {
        self.stages.iter().map(|s| s.duration_min).sum()
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::default_lesson()
    }
}
