//! `accord run | validate | types | sample`: procedure commands.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use accord_config::Settings;
use accord_recon::collector::{CollectOptions, SourceStatus};
use accord_recon::delivery::DeliveryOutcome;
use accord_recon::report::{render_combined, ParticipantReport, RunReport};
use accord_recon::sample::write_sample_csv;
use accord_recon::{run, AdapterRegistry, BuildContext, FieldTypeRegistry, Procedure, ProcedureDefinition, RunOptions};
use serde::Serialize;

use crate::exit_codes::EXIT_RUN_PARTIAL;
use crate::CliError;

pub struct RunArgs {
    pub definition: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub dry_run: bool,
    pub timeout: Option<u64>,
    pub sequential: bool,
}

/// JSON document written by `accord run`.
#[derive(Serialize)]
struct RunDocument<'a> {
    report: &'a RunReport,
    combined: serde_json::Value,
}

/// Read, parse and build a definition. Adapter paths resolve against the
/// definition's directory.
fn load_procedure(path: &Path) -> Result<Procedure, CliError> {
    let text = fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    let definition = ProcedureDefinition::from_toml(&text).map_err(|e| CliError::procedure(&e))?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let types = FieldTypeRegistry::with_builtins();
    let adapters = AdapterRegistry::with_builtins();
    let ctx = BuildContext {
        types: &types,
        adapters: &adapters,
        base_dir,
    };
    definition.build(&ctx).map_err(|e| CliError::procedure(&e))
}

/// Flags win over settings. `--timeout 0` means no timeout.
pub fn run_options(settings: &Settings, args: &RunArgs) -> RunOptions {
    let (collect_timeout, delivery_timeout) = match args.timeout {
        Some(0) => (None, None),
        Some(secs) => (Some(Duration::from_secs(secs)), Some(Duration::from_secs(secs))),
        None => (settings.collect_timeout(), settings.delivery_timeout()),
    };
    RunOptions {
        collect: CollectOptions {
            timeout: collect_timeout,
            parallel: settings.collect_parallel && !args.sequential,
        },
        deliver: settings.delivery_enabled && !args.dry_run,
        delivery_timeout,
    }
}

pub fn cmd_run(settings: &Settings, args: RunArgs) -> Result<(), CliError> {
    let procedure = load_procedure(&args.definition)?;
    let options = run_options(settings, &args);
    let outcome = run(&procedure, &options);

    let document = RunDocument {
        report: &outcome.report,
        combined: render_combined(&procedure, &outcome.combined),
    };
    let json_str = serde_json::to_string_pretty(&document)
        .map_err(|e| CliError::general(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = args.output {
        fs::write(path, &json_str)
            .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if args.json {
        println!("{json_str}");
    }

    // Human summary to stderr
    print_summary(&outcome.report);

    if outcome.report.is_partial() {
        let degraded: Vec<&str> = outcome.report.degraded().map(|p| p.code.as_str()).collect();
        return Err(CliError {
            code: EXIT_RUN_PARTIAL,
            message: format!("partial run: {}", degraded.join(", ")),
            hint: None,
        });
    }
    Ok(())
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "procedure '{}'{}: {} matched, {} combined",
        report.meta.procedure,
        if report.meta.dry_run { " (dry run)" } else { "" },
        report.matched_items,
        report.combined_items,
    );
    for p in &report.participants {
        eprintln!("  {}", participant_line(p));
    }
}

fn participant_line(p: &ParticipantReport) -> String {
    let status = match &p.status {
        SourceStatus::Ok => format!("{} collected, {} dropped", p.collected, p.dropped),
        SourceStatus::Failed(msg) => format!("collect failed: {msg}"),
        SourceStatus::TimedOut => "collect timed out".to_string(),
    };
    let delivery = match &p.delivery {
        DeliveryOutcome::Delivered(n) => format!("delivered {n}"),
        DeliveryOutcome::Rejected => "delivery rejected".to_string(),
        DeliveryOutcome::Failed(msg) => format!("delivery failed: {msg}"),
        DeliveryOutcome::TimedOut => "delivery timed out".to_string(),
        DeliveryOutcome::Skipped => "not delivered".to_string(),
    };
    format!("{}: {status}; {delivery}", p.code)
}

pub fn cmd_validate(definition: PathBuf) -> Result<(), CliError> {
    let procedure = load_procedure(&definition)?;
    eprintln!(
        "valid: procedure '{}' with {} participant(s), {} procedure field(s), {} matching rule(s), {} combining rule(s)",
        procedure.name(),
        procedure.participant_count(),
        procedure.procedure_fields().count(),
        procedure.matching_rules().len(),
        procedure.combining_rules().len(),
    );
    Ok(())
}

pub fn cmd_types() -> Result<(), CliError> {
    let registry = FieldTypeRegistry::with_builtins();
    let mut codes: Vec<&str> = registry.codes().collect();
    codes.sort_unstable();

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for code in codes {
        writeln!(handle, "{code}").map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

pub fn cmd_sample(
    definition: PathBuf,
    participant: &str,
    count: usize,
    seed: u64,
    output: Option<PathBuf>,
) -> Result<(), CliError> {
    let procedure = load_procedure(&definition)?;
    let target = procedure
        .participant_by_code(participant)
        .and_then(|id| procedure.participant(id))
        .ok_or_else(|| {
            let codes: Vec<&str> = procedure.participants().map(|(_, p)| p.code()).collect();
            CliError::args(format!("no participant '{participant}' in '{}'", procedure.name()))
                .with_hint(format!("participants: {}", codes.join(", ")))
        })?;

    let written = match output {
        Some(ref path) => {
            let file = fs::File::create(path)
                .map_err(|e| CliError::io(format!("cannot create {}: {e}", path.display())))?;
            let written = write_sample_csv(target, count, seed, file).map_err(|e| CliError::io(e.to_string()))?;
            eprintln!("wrote {}", path.display());
            written
        }
        None => {
            let stdout = std::io::stdout();
            write_sample_csv(target, count, seed, stdout.lock()).map_err(|e| CliError::io(e.to_string()))?
        }
    };
    tracing::info!("sample: {written} row(s) for '{participant}'");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RunArgs {
        RunArgs {
            definition: PathBuf::from("p.procedure.toml"),
            json: false,
            output: None,
            dry_run: false,
            timeout: None,
            sequential: false,
        }
    }

    #[test]
    fn settings_drive_defaults() {
        let options = run_options(&Settings::default(), &args());
        assert_eq!(options.collect.timeout, Some(Duration::from_secs(30)));
        assert!(options.collect.parallel);
        assert!(options.deliver);
        assert_eq!(options.delivery_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn flags_override_settings() {
        let a = RunArgs {
            dry_run: true,
            sequential: true,
            timeout: Some(0),
            ..args()
        };
        let options = run_options(&Settings::default(), &a);
        assert_eq!(options.collect.timeout, None);
        assert_eq!(options.delivery_timeout, None);
        assert!(!options.collect.parallel);
        assert!(!options.deliver);

        let a = RunArgs { timeout: Some(3), ..args() };
        let options = run_options(&Settings::default(), &a);
        assert_eq!(options.collect.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn disabled_delivery_in_settings_is_a_dry_run() {
        let settings = Settings {
            delivery_enabled: false,
            ..Settings::default()
        };
        assert!(!run_options(&settings, &args()).deliver);
    }

    #[test]
    fn participant_lines() {
        let p = ParticipantReport {
            code: "crm".into(),
            status: SourceStatus::TimedOut,
            fetched: 0,
            collected: 0,
            dropped: 0,
            delivery: DeliveryOutcome::Skipped,
            delivered: 0,
        };
        assert_eq!(participant_line(&p), "crm: collect timed out; not delivered");
    }
}
