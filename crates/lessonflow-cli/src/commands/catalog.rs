use std::path::{Path, PathBuf};

use clap::Subcommand;
use lessonflow_core::timer::scaler;
use lessonflow_core::{Config, DurationMode, StageCatalog};
use serde::Serialize;

use super::ModeArg;

#[derive(Subcommand)]
pub enum CatalogAction {
    /// Print the active catalog with scaled durations as JSON
    Show {
        /// Lesson length to scale to (defaults to timer.start_compressed in the config)
        #[arg(long, value_enum, conflicts_with = "compressed")]
        mode: Option<ModeArg>,
        /// Shorthand for --mode compressed
        #[arg(long)]
        compressed: bool,
    },
    /// Check a catalog TOML file
    Validate {
        /// Path to a TOML file with standard_total_min, compressed_total_min and [[stages]]
        path: PathBuf,
    },
}

#[derive(Serialize)]
struct StageView<'a> {
    index: usize,
    id: &'a str,
    label: &'a str,
    duration_min: f64,
    starts_at_secs: f64,
    scaled_secs: f64,
}

#[derive(Serialize)]
struct CatalogView<'a> {
    mode: DurationMode,
    total_secs: u64,
    standard_total_min: f64,
    compressed_total_min: f64,
    stages: Vec<StageView<'a>>,
}

pub fn run(action: CatalogAction, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        CatalogAction::Show { mode, compressed } => {
            let config = Config::load_from(config_path)?;
            let catalog = config.catalog();
            let mode = ModeArg::select(mode, compressed).unwrap_or_else(|| config.mode());
            let scaled = scaler::scale(&catalog, mode)?;
            let stages = catalog
                .stages
                .iter()
                .zip(&scaled.per_stage_secs)
                .enumerate()
                .map(|(index, (stage, secs))| StageView {
                    index,
                    id: &stage.id,
                    label: &stage.label,
                    duration_min: stage.duration_min,
                    starts_at_secs: scaled.cumulative_secs(index),
                    scaled_secs: *secs,
                })
                .collect();
            let view = CatalogView {
                mode,
                total_secs: scaled.total_secs,
                standard_total_min: catalog.standard_total_min,
                compressed_total_min: catalog.compressed_total_min,
                stages,
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        CatalogAction::Validate { path } => {
            let catalog = StageCatalog::load_from(&path)?;
            println!(
                "ok: {} stages, {} min standard, {} min compressed",
                catalog.len(),
                catalog.standard_total_min,
                catalog.compressed_total_min
            );
        }
    }
    Ok(())
}
