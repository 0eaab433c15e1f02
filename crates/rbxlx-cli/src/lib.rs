use std::env;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use rbxlx_config::{Config, ConfigError, LoadOptions};
use rbxlx_core::PlaceBuild;
use rbxlx_format::OutputFormat;
use rbxlx_ops::{BuildOptions, BuildOutcome, ExitCode, OperationError, VerifyOptions};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Build(args) => handle_build(cli.working_dir, args),
        Command::Verify(args) => handle_verify(cli.working_dir, args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let filter = match (quiet, verbose) {
        (true, _) => EnvFilter::new("warn"),
        (false, 0) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        (false, 1) => EnvFilter::new("debug"),
        (false, _) => EnvFilter::new("trace"),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .try_init();
}

fn handle_build(working_dir: Option<PathBuf>, args: BuildArgs) -> Result<i32> {
    let BuildArgs {
        config,
        output,
        dry_run,
        stdout,
        format,
    } = args;

    let mut options = LoadOptions::default();
    if let Some(dir) = working_dir {
        options = options.with_working_dir(dir);
    }
    if let Some(path) = config {
        options = options.with_override_path(path);
    }

    let config = match Config::load(options) {
        Ok(config) => config,
        Err(err) => return Ok(report_config_error(&err)),
    };
    for layer in &config.sources.layers {
        debug!(layer = %layer.describe(), "loaded configuration layer");
    }

    let output = output.map(|path| config.sources.working_directory.join(path));
    let engine = PlaceBuild::bootstrap(config);
    let options = BuildOptions {
        output_path: output,
        write_to_disk: !(dry_run || stdout),
        format: format.map(OutputFormat::from).unwrap_or_default(),
    };

    match engine.operations().build(options) {
        Ok(BuildOutcome {
            document,
            rendered,
            exit_code,
            ..
        }) => {
            if stdout {
                print!("{document}");
            } else {
                emit(&rendered)?;
            }
            Ok(exit_code)
        }
        Err(err) => Ok(report_operation_error(&err)),
    }
}

fn handle_verify(working_dir: Option<PathBuf>, args: VerifyArgs) -> Result<i32> {
    let VerifyArgs { file, format } = args;

    let base = match working_dir {
        Some(dir) => dir,
        None => env::current_dir().context("failed to resolve working directory")?,
    };
    let engine = PlaceBuild::bootstrap(Config::builtin(base));
    let options = VerifyOptions {
        path: file,
        format: format.map(OutputFormat::from).unwrap_or_default(),
    };

    match engine.operations().verify(options) {
        Ok(outcome) => {
            emit(&outcome.rendered)?;
            Ok(outcome.exit_code)
        }
        Err(err) => Ok(report_operation_error(&err)),
    }
}

fn report_config_error(err: &ConfigError) -> i32 {
    error!("{err}");
    ExitCode::Config.code()
}

fn report_operation_error(err: &OperationError) -> i32 {
    error!("{err}");
    err.exit_code().code()
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    name = "rbxlx-build",
    author,
    version,
    about = "Assemble Roblox place files from script sources",
    propagate_version = true
)]
struct Cli {
    /// Run as if started in this directory
    #[arg(short = 'C', long = "working-dir", value_name = "DIR", global = true)]
    working_dir: Option<PathBuf>,
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble the configured scripts into a place file
    Build(BuildArgs),
    /// Check an existing place file for structural problems
    Verify(VerifyArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Configuration file layered above the discovered ones
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the place output path
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,
    /// Assemble and report without writing the place file
    #[arg(long)]
    dry_run: bool,
    /// Print the place document to stdout instead of writing it
    #[arg(long, conflicts_with = "dry_run")]
    stdout: bool,
    /// Summary output format
    #[arg(long, value_enum)]
    format: Option<FormatValue>,
}

#[derive(Args)]
struct VerifyArgs {
    /// Place file to check
    file: PathBuf,
    /// Report output format
    #[arg(long, value_enum)]
    format: Option<FormatValue>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatValue {
    Plain,
    Json,
}

impl From<FormatValue> for OutputFormat {
    fn from(value: FormatValue) -> Self {
        match value {
            FormatValue::Plain => OutputFormat::Plain,
            FormatValue::Json => OutputFormat::Json,
        }
    }
}
