use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use kmplot_lib::commands::{self, ConsolePresentation};
use kmplot_lib::config::PlotConfig;
use kmplot_lib::device::{Controller, PlotterRegistry};
use kmplot_lib::logging::{init_logging, LogSettings};
use kmplot_lib::serial::Enumerator;

#[derive(Parser)]
#[command(name = "kmplot", version, about = "Find a serial plotter and send HPGL jobs to it")]
struct Cli {
    /// Plot configuration file (JSON, extension option names)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Replace the built-in plotter table with this JSON file
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Print diagnostics to stderr (same as KM_PLOT_DEBUG=1)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports and whether they match a known plotter
    List,
    /// List the known plotters
    Plotters,
    /// Keep polling for devices until Ctrl-C
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Frame a pre-rendered HPGL file and send it
    Send {
        file: PathBuf,
        /// Send to this port instead of the detected plotter
        #[arg(long)]
        port: Option<String>,
    },
    /// Print the effective plot configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut log_settings = LogSettings::from_env();
    log_settings.debug |= cli.verbose;
    if let Err(e) = init_logging(log_settings) {
        eprintln!("Logging unavailable: {}", e);
    }

    let config = match &cli.config {
        Some(path) => PlotConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PlotConfig::default(),
    };
    let registry = match &cli.registry {
        Some(path) => PlotterRegistry::from_json_file(path)
            .with_context(|| format!("Failed to load plotter table {}", path.display()))?,
        None => PlotterRegistry::builtin().clone(),
    };

    match cli.command {
        Command::List => commands::list_devices(&Enumerator::system(), &registry),
        Command::Plotters => commands::list_plotters(&registry),
        Command::Config => commands::show_config(&config)?,
        Command::Watch { interval } => {
            let controller = Controller::new(ConsolePresentation::default(), config.serial())
                .with_registry(registry);
            commands::watch_devices(Arc::new(controller), Duration::from_secs(interval.max(1))).await?;
        }
        Command::Send { file, port } => {
            let controller = Controller::new(ConsolePresentation::default(), config.serial())
                .with_registry(registry);
            let report = commands::send_file(&controller, &file, port.as_deref())
                .await
                .context("Cut failed")?;
            if let Some(ack) = report.acknowledgment {
                log::debug!("Plotter replied {:?}", String::from_utf8_lossy(&ack));
            }
        }
    }

    Ok(())
}
