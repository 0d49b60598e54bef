//! jsffi: drive the guest/host console bridge from the command line.
//!
//! Builds the same module registry the WASM build exposes, binds its
//! console function to stdout (or to tracing), and runs guest calls or
//! scripts against it.

mod commands;
mod config;
mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use jsffi_core::host::{TracingConsole, WriterConsole};
use jsffi_core::{HostFunction, ModuleRegistry};
use tracing_subscriber::EnvFilter;

/// jsffi: guest-to-host call bridge
#[derive(Parser)]
#[command(name = "jsffi", version, about = "Call host console functions from guest scripts")]
struct Cli {
    /// Config file path
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,

    /// Where the console function writes
    #[arg(long, global = true, value_enum, default_value_t = Sink::Stdout)]
    sink: Sink,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum Sink {
    Stdout,
    Tracing,
}

#[derive(Subcommand)]
enum Command {
    /// Call a function by qualified name, e.g. `jsffi.console_log '"hi"'`
    Call {
        /// Qualified name (module.function)
        target: String,
        /// Literal arguments ("text", b"bytes", 42, ...)
        #[arg(allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Execute a guest script
    Run {
        /// Script path
        script: PathBuf,
        /// Print each call's result
        #[arg(long)]
        echo: bool,
    },

    /// List registered modules
    Modules {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "jsffi={level},jsffi_core={level},jsffi::console=info"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

fn build_registry(cfg: &jsffi_core::Config, sink: Sink) -> Result<ModuleRegistry> {
    let termination = cfg.host.termination;
    let host: Arc<dyn HostFunction> = match sink {
        Sink::Stdout => Arc::new(WriterConsole::new(std::io::stdout(), termination)),
        Sink::Tracing => Arc::new(TracingConsole::new(termination)),
    };
    Ok(cfg.build_registry(host)?)
}

fn run(cli: Cli, config_path: PathBuf) -> Result<()> {
    if let Command::InitConfig { force } = cli.command {
        return commands::init_config::run(&config_path, force);
    }

    let cfg = config::load(&config_path)?;
    let registry = build_registry(&cfg, cli.sink)?;

    match cli.command {
        Command::Call { target, args } => commands::call::run(&registry, &target, &args),
        Command::Run { script, echo } => commands::run::run(&registry, &script, echo),
        Command::Modules { json } => commands::modules::run(&registry, json),
        Command::InitConfig { .. } => Ok(()),
    }
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.clone().unwrap_or_else(config::default_path);

    // The level comes from the config file, so peek at it before tracing is up.
    let level = config::load(&config_path)
        .map(|cfg| cfg.logging.level)
        .unwrap_or_else(|_| "warn".to_string());
    init_tracing(cli.verbose, &level);

    if let Err(e) = run(cli, config_path) {
        eprintln!("jsffi: {e:#}");
        std::process::exit(1);
    }
}
