//! splitdb - split-pane debugger front-end demo
//!
//! Drives the front-end against the in-memory scripted engine, stopped at
//! a line of a real source file.
//!
//! Usage:
//!   splitdb prog.py                  # Stop at line 1
//!   splitdb prog.py --line 12        # Stop at line 12
//!   splitdb prog.py --log-file x.log # Write tracing output to x.log
//!
//! Keys:
//!   Ctrl-X                           # Cycle focus: input, source, stack
//!   Tab                              # Complete
//!   F6                               # Toggle paste mode
//!   Ctrl-D                           # Quit on an empty line

use clap::Parser as ClapParser;
use splitdb::FrontendConfig;
use splitdb::engine::memory::ScriptedEngine;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "SPLITDB_LOG";

#[derive(ClapParser)]
#[command(name = "splitdb")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Split-pane terminal front-end for debugger shells", long_about = None)]
struct Args {
    /// Source file to stop in
    file: PathBuf,

    /// Line the scripted engine is suspended at
    #[arg(long, default_value_t = 1)]
    line: usize,

    /// Config file (default: $SPLITDB_CONFIG or ~/.config/splitdb/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs here; without it logging is discarded
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Percentage of the width given to the source pane
    #[arg(long)]
    source_width: Option<u16>,

    /// Values printed by `p NAME`, as NAME=VALUE
    #[arg(long = "value", value_name = "NAME=VALUE")]
    values: Vec<String>,
}

fn init_logging(log_file: Option<&PathBuf>) -> Result<(), String> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    // The terminal belongs to the TUI; never log to it
    let result = match log_file {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create log file {}: {}", path.display(), e))?;
            subscriber.with_writer(Mutex::new(file)).try_init()
        }
        None => subscriber.with_writer(io::sink).try_init(),
    };
    result.map_err(|e| format!("Failed to install logger: {}", e))
}

fn load_config(args: &Args) -> Result<FrontendConfig, String> {
    let mut config = match &args.config {
        Some(path) => FrontendConfig::load_from(path),
        None => FrontendConfig::load(),
    }
    .map_err(|e| e.to_string())?;

    if let Some(percent) = args.source_width {
        config.layout = config.layout.source_width(percent);
    }
    Ok(config)
}

fn parse_values(values: &[String]) -> Result<Vec<(String, String)>, String> {
    values
        .iter()
        .map(|v| {
            v.split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.to_string()))
                .ok_or_else(|| format!("Expected NAME=VALUE, got {:?}", v))
        })
        .collect()
}

fn main() {
    let args = Args::parse();

    let result = init_logging(args.log_file.as_ref())
        .and_then(|_| load_config(&args))
        .and_then(|config| {
            let values = parse_values(&args.values)?;
            let mut engine = ScriptedEngine::new(&args.file, args.line)?.with_values(values);
            splitdb::run(&mut engine, config)
        });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
