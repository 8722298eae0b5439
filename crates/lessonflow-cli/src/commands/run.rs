use std::path::Path;
use std::time::Duration;

use clap::Args;
use lessonflow_core::{LessonSession, TimerState, TokioTicker};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_timer, JsonLinePrinter, ModeArg};

type LiveSession = LessonSession<TokioTicker, JsonLinePrinter>;

#[derive(Args)]
pub struct RunArgs {
    /// Lesson length (defaults to timer.start_compressed in the config)
    #[arg(long, value_enum, conflicts_with = "compressed")]
    pub mode: Option<ModeArg>,
    /// Shorthand for --mode compressed
    #[arg(long)]
    pub compressed: bool,
    /// Seconds of lesson time between pace checks (0 disables)
    #[arg(long)]
    pub pace_interval: Option<u64>,
    /// Lesson seconds per real second
    #[arg(long, default_value = "1.0")]
    pub speed: f64,
}

const HELP: &str = "commands: p = pause/resume, r = reset, c = toggle compressed, \
n = next stage, b = previous stage, j N = jump to stage N, s = status, q = quit";

pub fn run(args: RunArgs, config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if !(args.speed.is_finite() && args.speed > 0.0) {
        return Err(format!("speed must be a positive number, got {}", args.speed).into());
    }
    let (config, timer) = build_timer(
        config_path,
        ModeArg::select(args.mode, args.compressed),
        args.pace_interval,
    )?;
    let period_ms = (config.timer.tick_period_ms as f64 / args.speed).max(1.0);
    let period = Duration::from_millis(period_ms as u64);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    let result = local.block_on(&rt, async move {
        let session = LessonSession::new(timer, TokioTicker, JsonLinePrinter).with_tick_period(period);
        drive(session).await
    });
    drop(local);
    // A pending stdin read would otherwise keep the runtime alive.
    rt.shutdown_background();
    result
}

async fn drive(mut session: LiveSession) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("{HELP}");
    session.start();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut poll = tokio::time::interval(Duration::from_millis(200));

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                match line? {
                    Some(line) => {
                        if !handle_command(&mut session, line.trim())? {
                            break;
                        }
                    }
                    None => {
                        // Without stdin nothing can start an idle or paused lesson.
                        if session.state() != TimerState::Running {
                            break;
                        }
                        stdin_open = false;
                    }
                }
            }
            _ = poll.tick() => {
                if session.reap_completed() || (!stdin_open && !session.is_ticking()) {
                    break;
                }
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
    Ok(())
}

/// Apply one stdin command. Returns `false` when the user quits.
fn handle_command(session: &mut LiveSession, input: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let mut parts = input.split_whitespace();
    let Some(command) = parts.next() else {
        return Ok(true);
    };

    let outcome = match command {
        "p" | "pause" | "resume" => {
            session.toggle_pause();
            Ok(())
        }
        "r" | "reset" => {
            session.reset();
            Ok(())
        }
        "c" | "compress" => {
            session.toggle_compression_mode();
            Ok(())
        }
        "n" | "next" => {
            session.next_stage();
            Ok(())
        }
        "b" | "back" => {
            session.previous_stage();
            Ok(())
        }
        "j" | "jump" => match parts.next().map(str::parse::<usize>) {
            Some(Ok(index)) => session.jump_to_stage(index),
            _ => {
                eprintln!("usage: j <stage index>");
                Ok(())
            }
        },
        "s" | "status" => {
            println!("{}", serde_json::to_string(&session.snapshot())?);
            Ok(())
        }
        "q" | "quit" => return Ok(false),
        "h" | "help" => {
            eprintln!("{HELP}");
            Ok(())
        }
        other => {
            eprintln!("unknown command: {other}");
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("error: {e}");
    }
    Ok(true)
}
