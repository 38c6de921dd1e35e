//! cp-core - Chemprop configuration resolver
//!
//! The main entry point for cp-core, handling:
//! - Option bag ingestion from JSON files or stdin
//! - Resolution and validation for train, hyperopt and predict
//! - Registry listing for each mode

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use cp_common::{Error, OutputFormat, Result};
use cp_config::{registry, resolve_hyperopt, resolve_predict, resolve_train, Mode, RawOptionBag};
use cp_core::exit_codes::ExitCode;
use cp_core::logging::{generate_run_id, init_logging, LogConfig, LogFormat, LogLevel};
use cp_core::SystemGpuProbe;
use serde::Serialize;
use tracing::{debug, info_span};

/// Resolve and validate chemprop training configurations
#[derive(Parser)]
#[command(name = "cp-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true, env = "CP_LOG_FORMAT")]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve training options
    Train(ResolveArgs),
    /// Resolve training plus hyperparameter search options
    Hyperopt(ResolveArgs),
    /// Check prediction options
    Predict(ResolveArgs),
    /// List the options recognized in a mode
    Options(OptionsArgs),
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// JSON object of option values ("-" reads stdin)
    #[arg(long, short = 'o', value_name = "FILE")]
    options: PathBuf,
}

#[derive(Args, Debug)]
struct OptionsArgs {
    #[arg(value_enum)]
    mode: ModeArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Train,
    Hyperopt,
    Predict,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Train => Mode::Train,
            ModeArg::Hyperopt => Mode::Hyperopt,
            ModeArg::Predict => Mode::Predict,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    let exit_code = {
        let _span = info_span!("cp_core", run_id = %run_id).entered();
        let outcome = match &cli.command {
            Commands::Train(args) => run_train(&cli.global, args),
            Commands::Hyperopt(args) => run_hyperopt(&cli.global, args),
            Commands::Predict(args) => run_predict(&cli.global, args),
            Commands::Options(args) => run_options(&cli.global, args),
        };
        match outcome {
            Ok(()) => ExitCode::Clean,
            Err(err) => report_error(&cli.global, &err),
        }
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_train(global: &GlobalOpts, args: &ResolveArgs) -> Result<()> {
    let bag = load_bag(&args.options)?;
    let config = resolve_train(bag, &SystemGpuProbe)?;
    emit(global.format, &config, || config.summary())
}

fn run_hyperopt(global: &GlobalOpts, args: &ResolveArgs) -> Result<()> {
    let bag = load_bag(&args.options)?;
    let config = resolve_hyperopt(bag, &SystemGpuProbe)?;
    emit(global.format, &config, || config.summary())
}

fn run_predict(global: &GlobalOpts, args: &ResolveArgs) -> Result<()> {
    let bag = load_bag(&args.options)?;
    let config = resolve_predict(bag)?;
    emit(global.format, &config, || {
        format!(
            "predict {} -> {}",
            config.test_path.display(),
            config.preds_path.display()
        )
    })
}

#[derive(Serialize)]
struct OptionListing<'a> {
    mode: Mode,
    options: Vec<&'a cp_config::OptionSpec>,
}

fn run_options(global: &GlobalOpts, args: &OptionsArgs) -> Result<()> {
    let mode = Mode::from(args.mode);
    let registry = registry(mode);
    let listing = OptionListing {
        mode,
        options: registry.iter().collect(),
    };
    emit(global.format, &listing, || {
        let mut table = format!("{} options ({})", mode, registry.len());
        for spec in registry.iter() {
            let default = spec
                .default
                .as_ref()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "-".to_string());
            table.push_str(&format!(
                "\n  {:<44} {:<12} {:<9} {}",
                spec.name,
                spec.kind.to_string(),
                if spec.required { "required" } else { "" },
                default
            ));
        }
        table
    })
}

// ============================================================================
// Helpers
// ============================================================================

fn load_bag(source: &Path) -> Result<RawOptionBag> {
    if source == Path::new("-") {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| Error::io("<stdin>", e))?;
        debug!(bytes = content.len(), "read options from stdin");
        RawOptionBag::from_json_str(&content)
    } else {
        debug!(path = %source.display(), "read options file");
        RawOptionBag::from_file(source)
    }
}

/// Write a command payload to stdout in the requested format.
fn emit<T: Serialize>(
    format: OutputFormat,
    payload: &T,
    summary: impl FnOnce() -> String,
) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(payload)?),
        OutputFormat::Compact => println!("{}", serde_json::to_string(payload)?),
        OutputFormat::Summary => println!("{}", summary()),
        OutputFormat::Exitcode => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct ErrorOutput {
    exit_code: i32,
    exit_code_name: &'static str,
    error: cp_common::ErrorReport,
}

/// Print a failure to stderr and pick the exit code.
fn report_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    let code = ExitCode::from_error(err);
    let report = err.report();
    match global.format {
        OutputFormat::Json | OutputFormat::Compact => {
            let output = ErrorOutput {
                exit_code: code.as_i32(),
                exit_code_name: code.code_name(),
                error: report,
            };
            let rendered = if global.format == OutputFormat::Json {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            };
            match rendered {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
        }
        OutputFormat::Summary => eprintln!("{}", report.human()),
        OutputFormat::Exitcode => {}
    }
    code
}
