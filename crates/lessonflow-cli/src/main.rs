use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use lessonflow_core::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "lessonflow-cli", version, about = "Lesson Flow CLI")]
struct Cli {
    /// Config file to use instead of ~/.config/lessonflow/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live lesson in the terminal
    Run(commands::run::RunArgs),
    /// Replay a lesson instantly with simulated ticks
    Simulate(commands::simulate::SimulateArgs),
    /// Stage catalog inspection
    Catalog {
        #[command(subcommand)]
        action: commands::catalog::CatalogAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Print shell completions
    Completions {
        shell: clap_complete::Shell,
    },
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env("LESSONFLOW_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries JSON events; logs go to stderr.
    let stderr_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::path);
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, &config_path),
        Commands::Simulate(args) => commands::simulate::run(args, &config_path),
        Commands::Catalog { action } => commands::catalog::run(action, &config_path),
        Commands::Config { action } => commands::config::run(action, &config_path),
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "lessonflow-cli",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
