mod persistence;
mod runner;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// Invoice OCR intake: queue files with the OCR service, poll until they
/// finish, and export the extracted payloads.
#[derive(Debug, Parser)]
#[command(name = "intake", version, about)]
struct Cli {
    /// Invoice images or PDFs to process.
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Use the canned OCR service instead of the network.
    #[arg(long)]
    mock: bool,

    /// POST each extracted record to the save endpoint when done.
    #[arg(long)]
    save: bool,

    /// Directory for exported payloads and the session snapshot.
    #[arg(long, default_value = "output")]
    out: PathBuf,

    /// Give up on the whole session after this many seconds.
    #[arg(long, default_value_t = 600)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    init_logging();
    // A .env next to the binary overrides nothing already in the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut settings = intake_engine::EngineSettings::from_env();
    if cli.mock {
        settings.use_mock_data = true;
    }

    runner::run(cli, settings)
}

fn init_logging() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
