use std::path::Path;

use clap::Args;
use lessonflow_core::{LessonSession, ManualTicker, StageCatalog};

use super::{build_timer, JsonLinePrinter, ModeArg};

#[derive(Args)]
pub struct SimulateArgs {
    /// Lesson seconds to simulate (defaults to the whole lesson)
    #[arg(long)]
    pub seconds: Option<u64>,
    /// Lesson length (defaults to timer.start_compressed in the config)
    #[arg(long, value_enum, conflicts_with = "compressed")]
    pub mode: Option<ModeArg>,
    /// Shorthand for --mode compressed
    #[arg(long)]
    pub compressed: bool,
    /// Seconds of lesson time between pace checks (0 disables)
    #[arg(long)]
    pub pace_interval: Option<u64>,
    /// Manual jump as STAGE@SECOND, where STAGE is an index or a stage id
    #[arg(long = "jump", value_name = "STAGE@SECOND")]
    pub jumps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PlannedJump {
    at_secs: u64,
    stage_index: usize,
}

fn parse_jump(raw: &str, catalog: &StageCatalog) -> Result<PlannedJump, String> {
    let (stage, at) = raw
        .split_once('@')
        .ok_or_else(|| format!("invalid jump '{raw}', expected STAGE@SECOND"))?;
    let at_secs = at
        .trim()
        .parse::<u64>()
        .map_err(|_| format!("invalid second '{at}' in jump '{raw}'"))?;
    let stage = stage.trim();
    let stage_index = match stage.parse::<usize>() {
        Ok(index) => index,
        Err(_) => catalog
            .position(stage)
            .ok_or_else(|| format!("unknown stage '{stage}' in jump '{raw}'"))?,
    };
    Ok(PlannedJump {
        at_secs,
        stage_index,
    })
}

pub fn run(args: SimulateArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let (_, timer) = build_timer(
        config_path,
        ModeArg::select(args.mode, args.compressed),
        args.pace_interval,
    )?;
    let limit = args.seconds.unwrap_or(timer.total_secs());

    let mut jumps = args
        .jumps
        .iter()
        .map(|raw| parse_jump(raw, timer.catalog()))
        .collect::<Result<Vec<_>, _>>()?;
    jumps.sort_by_key(|j| j.at_secs);

    let ticker = ManualTicker::new();
    let mut session = LessonSession::new(timer, ticker.clone(), JsonLinePrinter);
    session.start();

    let mut now = 0;
    for jump in jumps {
        if jump.at_secs > limit {
            tracing::warn!(at_secs = jump.at_secs, limit, "jump after end of simulation ignored");
            continue;
        }
        ticker.advance(jump.at_secs - now);
        now = jump.at_secs;
        session.jump_to_stage(jump.stage_index)?;
    }
    ticker.advance(limit - now);

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}
