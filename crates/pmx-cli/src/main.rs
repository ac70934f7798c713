use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;

/// Argument/config errors.
const EXIT_USAGE: u8 = 2;

#[derive(Parser)]
#[command(name = "pmx")]
#[command(about = "Processing module executor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in modules
    List,

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> run)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Execute one module and write its outputs
    Run {
        /// Module name (see `pmx list`)
        #[arg(long)]
        module: String,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<PathBuf>,

        /// Saved input tree (JSON) reconciled into the module's inputs
        #[arg(long)]
        saved: Option<PathBuf>,

        /// Set a top-level input: LABEL=VALUE
        #[arg(long = "set", value_parser = commands::parse_key_val)]
        sets: Vec<(String, String)>,

        /// Route an output: TAG=ABSOLUTE_PATH
        #[arg(long = "output", value_parser = commands::parse_key_val)]
        outputs: Vec<(String, String)>,

        /// Overrides run.output_dir
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// Treat the run as interactive (validation errors are not echoed to stderr)
        #[arg(long, default_value_t = false)]
        interactive: bool,

        /// Stop the module after this many milliseconds (the run fails as cancelled)
        #[arg(long = "timeout-ms")]
        timeout_ms: Option<u64>,
    },
}

fn main() -> ExitCode {
    // Silent if the file does not exist; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    match cli.cmd {
        Commands::List => commands::list_modules(),
        Commands::ConfigHash { paths } => {
            let loaded = pmx_config::load_layered_yaml(paths.as_slice())?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            module,
            config_paths,
            saved,
            sets,
            outputs,
            out_dir,
            interactive,
            timeout_ms,
        } => commands::run::run_module(commands::run::RunArgs {
            module,
            config_paths,
            saved,
            sets,
            outputs,
            out_dir,
            interactive,
            timeout_ms,
        }),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
