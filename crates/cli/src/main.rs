// accord CLI - run reconciliation procedures from TOML definitions

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use accord_config::{LogLevel, Settings, SettingsError};
use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;

use exit_codes::{procedure_exit_code, procedure_hint, EXIT_ERROR, EXIT_IO, EXIT_SETTINGS_INVALID, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "accord")]
#[command(about = "Reconcile records across participants of a procedure")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: the user config directory)
    #[arg(long, global = true, env = "ACCORD_SETTINGS", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Raise log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only errors on stderr, no log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, match, combine and deliver
    #[command(after_help = "\
Examples:
  accord run employees.procedure.toml
  accord run employees.procedure.toml --json
  accord run employees.procedure.toml --dry-run --output report.json
  accord run employees.procedure.toml --timeout 5 --sequential")]
    Run {
        /// Path to the .procedure.toml definition
        definition: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Skip delivery
        #[arg(long)]
        dry_run: bool,

        /// Per-participant timeout in seconds (0 disables)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Fetch participants one after another
        #[arg(long)]
        sequential: bool,
    },

    /// Build the procedure without running it
    #[command(after_help = "\
Examples:
  accord validate employees.procedure.toml")]
    Validate {
        /// Path to the .procedure.toml definition
        definition: PathBuf,
    },

    /// List the registered field-type codes
    Types,

    /// Write synthetic CSV rows for one participant
    #[command(after_help = "\
Examples:
  accord sample employees.procedure.toml --participant hr
  accord sample employees.procedure.toml --participant crm --count 100 --seed 7 -o crm.csv")]
    Sample {
        /// Path to the .procedure.toml definition
        definition: PathBuf,

        /// Participant code
        #[arg(long, short = 'p')]
        participant: String,

        /// Number of rows
        #[arg(long, short = 'n', default_value_t = 10)]
        count: usize,

        /// RNG seed; same seed, same rows
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Output file (omit for stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  accord-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = load_settings(cli.settings.as_deref()).and_then(|(settings, fallback)| {
        let level = if cli.quiet {
            LogLevel::Off
        } else {
            settings.log_level.raised_by(cli.verbose)
        };
        init_tracing(level);
        if let Some(e) = fallback {
            tracing::warn!("{}: {e}; using default settings", Settings::config_path_display());
        }

        match cli.command {
            Commands::Run {
                definition,
                json,
                output,
                dry_run,
                timeout,
                sequential,
            } => recon::cmd_run(
                &settings,
                recon::RunArgs {
                    definition,
                    json,
                    output,
                    dry_run,
                    timeout,
                    sequential,
                },
            ),
            Commands::Validate { definition } => recon::cmd_validate(definition),
            Commands::Types => recon::cmd_types(),
            Commands::Sample {
                definition,
                participant,
                count,
                seed,
                output,
            } => recon::cmd_sample(definition, &participant, count, seed, output),
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Log lines go to stderr so stdout stays machine-readable.
fn init_tracing(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .try_init();
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// An explicit settings file must parse; the default one falls back and
/// hands back the reason so it can be logged.
fn load_settings(path: Option<&std::path::Path>) -> Result<(Settings, Option<SettingsError>), CliError> {
    match path {
        None => Ok(Settings::load()),
        Some(path) => Settings::load_from(path)
            .map(|settings| (settings, None))
            .map_err(|e| match e {
                SettingsError::Io(_) => CliError::io(format!("{}: {e}", path.display())),
                SettingsError::Parse(_) => CliError {
                    code: EXIT_SETTINGS_INVALID,
                    message: format!("{}: {e}", path.display()),
                    hint: Some(format!("default settings live in {}", Settings::config_path_display())),
                },
            }),
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Failure with no more specific code.
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a procedure error with its exit code and hint.
    pub fn procedure(err: &accord_recon::ProcedureError) -> Self {
        Self {
            code: procedure_exit_code(err),
            message: err.to_string(),
            hint: procedure_hint(err),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
