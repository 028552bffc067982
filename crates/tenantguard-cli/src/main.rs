//! TenantGuard - cloud tenant compliance audit and remediation CLI.
//!
//! ## Commands
//!
//! - `audit`: Evaluate the control catalog against a tenant and persist
//!   the Run as JSON and CSV
//! - `compare`: Classify drift between two persisted Runs
//! - `remediate`: Preview or apply fixes for a Run's failed controls

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

use tenantguard_core::connector::fakes::{compliant_tenant, drifted_tenant, StaticBackend};
use tenantguard_core::{
    compare_runs, load_run, remediate, write_log, BackendClient, ConnectorContext,
    ConnectorSettings, Emitter, Mode, Orchestrator, Run, RunSettings, ServiceKind,
    DEFAULT_SAMPLE_SIZE,
};

#[derive(Parser)]
#[command(name = "tenantguard")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cloud tenant compliance audit and remediation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control catalog against a tenant and persist the results
    Audit {
        /// Tenant fixture file (JSON map of service -> resource -> object)
        #[arg(long, conflicts_with = "demo")]
        fixture: Option<PathBuf>,

        /// Built-in demo tenant
        #[arg(long, value_enum)]
        demo: Option<DemoTenant>,

        /// Output directory for the JSON and CSV artifacts
        #[arg(short, long, default_value = "reports")]
        out: PathBuf,

        /// Timestamp artifact names so successive runs never overwrite
        #[arg(long)]
        timestamped: bool,

        /// Skip the mail service
        #[arg(long)]
        skip_mail: bool,

        /// Skip the collaboration service
        #[arg(long)]
        skip_collaboration: bool,

        /// Skip the compliance service
        #[arg(long)]
        skip_compliance: bool,

        /// Override admin endpoint for the directory service
        #[arg(long)]
        admin_endpoint: Option<String>,

        /// Mailbox sample size for sample-based controls
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,

        /// Per-control backend timeout in seconds
        #[arg(long, default_value = "45")]
        timeout_secs: u64,
    },

    /// Compare two persisted Runs and classify the drift
    Compare {
        /// Earlier run artifact (JSON)
        before: PathBuf,

        /// Later run artifact (JSON)
        after: PathBuf,

        /// Emit the comparison as JSON instead of a markdown table
        #[arg(long)]
        json: bool,
    },

    /// Preview or apply fixes for a Run's failed controls
    Remediate {
        /// Run artifact (JSON) the plan is built from
        run: PathBuf,

        /// Execution mode: preview reports, apply mutates
        #[arg(long, value_enum)]
        mode: ModeArg,

        /// Tenant fixture file (JSON map of service -> resource -> object)
        #[arg(long, conflicts_with = "demo")]
        fixture: Option<PathBuf>,

        /// Built-in demo tenant
        #[arg(long, value_enum)]
        demo: Option<DemoTenant>,

        /// Directory for the remediation log
        #[arg(long, default_value = "reports")]
        log_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DemoTenant {
    /// Every control passes
    Compliant,
    /// Every control fails
    Drifted,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Preview,
    Apply,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Preview => Mode::Preview,
            ModeArg::Apply => Mode::Apply,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tenantguard_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Audit {
            fixture,
            demo,
            out,
            timestamped,
            skip_mail,
            skip_collaboration,
            skip_compliance,
            admin_endpoint,
            sample_size,
            timeout_secs,
        } => {
            let settings = ConnectorSettings {
                skip_mail,
                skip_collaboration,
                skip_compliance,
                admin_endpoint,
            };
            let run_settings = RunSettings {
                backend_timeout: Duration::from_secs(timeout_secs),
                sample_size,
            };
            let clients = resolve_tenant(fixture.as_deref(), demo)?;
            cmd_audit(clients, &settings, run_settings, &out, timestamped).await
        }
        Commands::Compare {
            before,
            after,
            json,
        } => cmd_compare(&before, &after, json),
        Commands::Remediate {
            run,
            mode,
            fixture,
            demo,
            log_dir,
        } => {
            let clients = resolve_tenant(fixture.as_deref(), demo)?;
            cmd_remediate(&run, mode.into(), clients, &log_dir).await
        }
    }
}

// ---------------------------------------------------------------------------
// Tenant sources
// ---------------------------------------------------------------------------

type Clients = BTreeMap<ServiceKind, Arc<dyn BackendClient>>;

fn resolve_tenant(fixture: Option<&Path>, demo: Option<DemoTenant>) -> Result<Clients> {
    match (fixture, demo) {
        (Some(path), _) => clients_from_fixture(path),
        (None, Some(DemoTenant::Compliant)) => Ok(compliant_tenant()),
        (None, Some(DemoTenant::Drifted)) => Ok(drifted_tenant()),
        (None, None) => anyhow::bail!("a tenant is required: pass --fixture or --demo"),
    }
}

/// Load a tenant fixture: a JSON object keyed by service name, each value
/// an object of resource name to configuration object.
fn clients_from_fixture(path: &Path) -> Result<Clients> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read fixture {}", path.display()))?;
    let fixture: BTreeMap<String, BTreeMap<String, Value>> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse fixture {}", path.display()))?;

    let mut clients: Clients = BTreeMap::new();
    for (name, resources) in fixture {
        let service = ServiceKind::ALL
            .into_iter()
            .find(|s| s.name() == name)
            .with_context(|| format!("unknown service '{}' in fixture", name))?;
        let mut backend = StaticBackend::new();
        for (resource, object) in resources {
            backend = backend.with(&resource, object);
        }
        clients.insert(service, Arc::new(backend));
    }
    Ok(clients)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Run the full audit pipeline and persist the artifacts
async fn cmd_audit(
    clients: Clients,
    settings: &ConnectorSettings,
    run_settings: RunSettings,
    out: &Path,
    timestamped: bool,
) -> Result<()> {
    let ctx = ConnectorContext::connect(settings, clients).await;
    let run = Orchestrator::new(run_settings).run(&ctx).await;

    let emitter = Emitter::new(out, timestamped);
    let json_path = emitter.write_json(&run)?;
    let csv_path = emitter.write_csv(&run)?;

    print_run_summary(&run);
    println!();
    println!("JSON: {}", json_path.display());
    println!("CSV:  {}", csv_path.display());

    if run.degraded() {
        info!("one or more services were unavailable; some controls are Manual");
    }
    Ok(())
}

fn print_run_summary(run: &Run) {
    println!("Run {} ({} controls)", run.run_id, run.results.len());
    println!(
        "  Pass: {}  Fail: {}  Manual: {}  Error: {}",
        run.pass_count(),
        run.fail_count(),
        run.manual_count(),
        run.error_count()
    );
    for (service, status) in run.connections.iter() {
        println!("  {}: {:?}", service, status);
    }
}

/// Compare two persisted Runs
fn cmd_compare(before: &Path, after: &Path, json: bool) -> Result<()> {
    let before_run = load_run(before)?;
    let after_run = load_run(after)?;
    let diff = compare_runs(&before_run, &after_run);

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        print!("{}", diff.render_markdown());
    }
    Ok(())
}

/// Build and execute the remediation plan for a persisted Run
async fn cmd_remediate(run_path: &Path, mode: Mode, clients: Clients, log_dir: &Path) -> Result<()> {
    let run = load_run(run_path)?;
    let ctx = ConnectorContext::connect(&ConnectorSettings::default(), clients).await;

    let summary = remediate(&ctx, &run, mode).await;
    let log_path = write_log(log_dir, &summary)?;

    println!("Remediation ({}) for run {}", summary.mode, run.run_id);
    println!(
        "  Succeeded: {}  Failed: {}  Skipped: {}  Would change: {}",
        summary.succeeded(),
        summary.failed(),
        summary.skipped(),
        summary.would_change()
    );
    for record in &summary.records {
        println!("  {:?} {} - {}", record.outcome, record.control_id, record.detail);
    }
    println!("Log: {}", log_path.display());

    if summary.failed() > 0 {
        anyhow::bail!("{} remediation step(s) failed", summary.failed());
    }
    Ok(())
}
