use std::path::{Path, PathBuf};
use std::time::Duration;

use accord_recon::collector::{CollectOptions, SourceStatus};
use accord_recon::delivery::DeliveryOutcome;
use accord_recon::report::render_combined;
use accord_recon::{run, AdapterRegistry, BuildContext, FieldTypeRegistry, Procedure, ProcedureDefinition, RunOptions};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_definition(name: &str) -> ProcedureDefinition {
    let path = fixtures_dir().join(name);
    let text = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    ProcedureDefinition::from_toml(&text).unwrap()
}

fn build(definition: &ProcedureDefinition, base_dir: &Path) -> Procedure {
    let types = FieldTypeRegistry::with_builtins();
    let adapters = AdapterRegistry::with_builtins();
    let ctx = BuildContext {
        types: &types,
        adapters: &adapters,
        base_dir,
    };
    definition.build(&ctx).unwrap()
}

/// The employees fixture with every participant writing to `out_dir`.
fn employees(out_dir: &Path) -> Procedure {
    let mut definition = load_definition("employees.procedure.toml");
    for participant in &mut definition.participants {
        let output = out_dir.join(format!("{}.out.csv", participant.code));
        participant
            .options
            .insert("output".into(), toml::Value::String(output.display().to_string()));
    }
    build(&definition, &fixtures_dir())
}

fn row_for<'a>(rows: &'a [serde_json::Value], id: i64) -> &'a serde_json::Value {
    rows.iter()
        .find(|r| r["id"] == id)
        .unwrap_or_else(|| panic!("no combined row for id {id}"))
}

// -------------------------------------------------------------------------
// Three participants, five shared ids
// -------------------------------------------------------------------------

#[test]
fn three_way_combines_five_items() {
    let out = tempfile::tempdir().unwrap();
    let procedure = employees(out.path());
    let outcome = run(&procedure, &RunOptions::default());

    assert_eq!(outcome.report.matched_items, 5);
    assert_eq!(outcome.report.combined_items, 5);
    assert!(!outcome.report.is_partial());
    for p in &outcome.report.participants {
        assert_eq!(p.status, SourceStatus::Ok);
        assert_eq!(p.collected, 5);
        assert_eq!(p.dropped, 0);
        assert_eq!(p.delivery, DeliveryOutcome::Delivered(5));
    }

    let rendered = render_combined(&procedure, &outcome.combined);
    let rows = rendered.as_array().unwrap();
    assert_eq!(rows.len(), 5);

    // crm wins the name wherever it has one.
    assert_eq!(row_for(rows, 101)["name"], "Ann Lee-Smith");
    assert_eq!(row_for(rows, 102)["name"], "Robert Stone");
    assert_eq!(row_for(rows, 105)["name"], "Eve Moss");
    // crm has no name for 104; directory is next.
    assert_eq!(row_for(rows, 104)["name"], "D. Park");
}

#[test]
fn single_source_fields_pass_through() {
    let out = tempfile::tempdir().unwrap();
    let procedure = employees(out.path());
    let outcome = run(&procedure, &RunOptions::default());
    let rendered = render_combined(&procedure, &outcome.combined);
    let rows = rendered.as_array().unwrap();

    assert_eq!(row_for(rows, 101)["email"], "ann@example.com");
    assert_eq!(row_for(rows, 104)["groups"], serde_json::json!(["staff", "admins"]));
    assert_eq!(row_for(rows, 104)["phone"], "555-0104");
    // Absent everywhere: omitted, not null.
    assert!(row_for(rows, 103).get("email").is_none());
    assert!(row_for(rows, 103).get("phone").is_none());
}

#[test]
fn combined_order_follows_first_participant() {
    let out = tempfile::tempdir().unwrap();
    let procedure = employees(out.path());
    let outcome = run(&procedure, &RunOptions::default());
    let rendered = render_combined(&procedure, &outcome.combined);
    let ids: Vec<i64> = rendered
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![101, 102, 103, 104, 105]);
}

// -------------------------------------------------------------------------
// Delivery through the CSV adapter
// -------------------------------------------------------------------------

#[test]
fn csv_delivery_writes_participant_columns() {
    let out = tempfile::tempdir().unwrap();
    let procedure = employees(out.path());
    run(&procedure, &RunOptions::default());

    let hr = std::fs::read_to_string(out.path().join("hr.out.csv")).unwrap();
    let lines: Vec<&str> = hr.lines().collect();
    assert_eq!(lines[0], "emp_id,full_name,email");
    assert_eq!(lines[1], "101,Ann Lee-Smith,ann@example.com");
    assert_eq!(lines[3], "103,Cy Young,");
    assert_eq!(lines[4], "104,D. Park,dee@example.com");
    assert_eq!(lines.len(), 6);

    let directory = std::fs::read_to_string(out.path().join("directory.out.csv")).unwrap();
    assert!(directory.starts_with("uid,display_name,groups\n"));
    assert!(directory.contains("104,D. Park,staff; admins\n"));

    let crm = std::fs::read_to_string(out.path().join("crm.out.csv")).unwrap();
    assert!(crm.contains("102,Robert Stone,555-0102\n"));
}

#[test]
fn dry_run_writes_nothing() {
    let out = tempfile::tempdir().unwrap();
    let procedure = employees(out.path());
    let options = RunOptions {
        deliver: false,
        ..RunOptions::default()
    };
    let outcome = run(&procedure, &options);
    assert_eq!(outcome.report.combined_items, 5);
    assert!(!out.path().join("hr.out.csv").exists());
}

#[test]
fn sequential_collection_gives_same_result() {
    let out = tempfile::tempdir().unwrap();
    let procedure = employees(out.path());
    let options = RunOptions {
        collect: CollectOptions {
            timeout: None,
            parallel: false,
        },
        deliver: false,
        delivery_timeout: None,
    };
    let sequential = run(&procedure, &options);
    let parallel = run(
        &procedure,
        &RunOptions {
            deliver: false,
            ..RunOptions::default()
        },
    );
    assert_eq!(
        render_combined(&procedure, &sequential.combined),
        render_combined(&procedure, &parallel.combined)
    );
}

// -------------------------------------------------------------------------
// Degraded runs
// -------------------------------------------------------------------------

const SLOW: &str = r#"
name = "Slow"

[[participants]]
code = "fast"
adapter = "memory"
options.items = [{ id = 1, name = "Ann" }, { id = 2, name = "Bob" }]
fields = [
  { name = "id", type = "item_id", required = true },
  { name = "name", type = "string" },
]

[[participants]]
code = "slow"
adapter = "memory"
options.items = [{ id = 1, name = "Annie" }]
options.delay_ms = 2000
fields = [
  { name = "id", type = "item_id", required = true },
  { name = "name", type = "string" },
]

[[procedure_fields]]
id = "id"
fields = ["fast.id", "slow.id"]

[[procedure_fields]]
id = "name"
fields = ["fast.name", "slow.name"]

[[matching]]
participants = ["fast", "slow"]
fields = ["id"]

[[combining]]
field = "slow.name"
priority = 10
"#;

#[test]
fn slow_source_times_out_and_run_is_partial() {
    let definition = ProcedureDefinition::from_toml(SLOW).unwrap();
    let procedure = build(&definition, Path::new("."));
    let timeout = Some(Duration::from_millis(100));
    let options = RunOptions {
        collect: CollectOptions { timeout, parallel: true },
        deliver: true,
        delivery_timeout: timeout,
    };
    let outcome = run(&procedure, &options);

    assert!(outcome.report.is_partial());
    let slow = &outcome.report.participants[1];
    assert_eq!(slow.code, "slow");
    assert_eq!(slow.status, SourceStatus::TimedOut);
    assert_eq!(slow.delivery, DeliveryOutcome::Skipped);

    // Only the fast source's records reach the output.
    let rendered = render_combined(&procedure, &outcome.combined);
    let rows = rendered.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "Ann");
    assert_eq!(outcome.report.participants[0].delivery, DeliveryOutcome::Delivered(2));
}

#[test]
fn failing_source_is_reported() {
    let input = SLOW
        .replacen("options.delay_ms = 2000", r#"options.fail = "connection refused""#, 1);
    let definition = ProcedureDefinition::from_toml(&input).unwrap();
    let procedure = build(&definition, Path::new("."));
    let outcome = run(&procedure, &RunOptions::default());

    let slow = &outcome.report.participants[1];
    match &slow.status {
        SourceStatus::Failed(msg) => assert!(msg.contains("connection refused")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(outcome.report.combined_items, 2);
}

#[test]
fn missing_csv_source_fails_only_that_participant() {
    let out = tempfile::tempdir().unwrap();
    let mut definition = load_definition("employees.procedure.toml");
    definition.participants[2]
        .options
        .insert("source".into(), toml::Value::String("no-such-file.csv".into()));
    for participant in &mut definition.participants {
        let output = out.path().join(format!("{}.out.csv", participant.code));
        participant
            .options
            .insert("output".into(), toml::Value::String(output.display().to_string()));
    }
    let procedure = build(&definition, &fixtures_dir());
    let outcome = run(&procedure, &RunOptions::default());

    assert!(outcome.report.is_partial());
    assert!(matches!(outcome.report.participants[2].status, SourceStatus::Failed(_)));
    assert_eq!(outcome.report.combined_items, 5);

    // Without crm, directory has the highest priority name.
    let rendered = render_combined(&procedure, &outcome.combined);
    assert_eq!(row_for(rendered.as_array().unwrap(), 101)["name"], "A. Lee");
    assert!(!out.path().join("crm.out.csv").exists());
}
