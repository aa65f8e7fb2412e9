use anyhow::{Context, Result};
use clap::Parser;
use perfkpi::cli::{Cli, KpiSelection, OutputFormat};
use perfkpi::config::KpiConfig;
use perfkpi::csv_output::{CsvResultSink, ResultSink};
use perfkpi::device::{AdbChannel, Device, DeviceControl, DeviceSessionState, ThreadWait, Wait};
use perfkpi::json_output::JsonKpiSummary;
use perfkpi::runner::{KpiOutcome, KpiRunner};
use perfkpi::setup;
use std::thread;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` raises the level to trace
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Everything one device session produced
struct SessionReport {
    dsn: String,
    session: Option<DeviceSessionState>,
    outcomes: Vec<KpiOutcome>,
}

impl SessionReport {
    fn failed_runs(&self) -> usize {
        match self.session {
            Some(_) => self.outcomes.iter().filter(|o| !o.passed).count(),
            // The device never got past validation
            None => 1,
        }
    }
}

fn run_session(
    dsn: &str,
    control: &dyn DeviceControl,
    wait: &dyn Wait,
    config: &KpiConfig,
    sink: &dyn ResultSink,
    selection: KpiSelection,
) -> SessionReport {
    let device = match Device::connect(control, wait, dsn) {
        Ok(device) => device,
        Err(e) => {
            tracing::error!(dsn, "Device validation failed: {}", e);
            return SessionReport {
                dsn: dsn.to_string(),
                session: None,
                outcomes: Vec::new(),
            };
        }
    };

    let session = setup::open_session(&device, config);
    let mut runner = KpiRunner::new(&device, config, sink, session);
    let outcomes = selection
        .kinds()
        .iter()
        .map(|&kind| runner.run_with_retry(kind, config.retry_policy()))
        .collect();

    SessionReport {
        dsn: dsn.to_string(),
        session: Some(runner.into_session()),
        outcomes,
    }
}

fn print_report(report: &SessionReport, format: OutputFormat) -> Result<()> {
    let Some(session) = &report.session else {
        if format == OutputFormat::Text {
            println!("{}: device validation failed", report.dsn);
        }
        return Ok(());
    };

    for outcome in &report.outcomes {
        match format {
            OutputFormat::Json => {
                let summary = JsonKpiSummary::new(session, outcome);
                println!("{}", summary.to_json().context("Failed to serialize KPI summary")?);
            }
            OutputFormat::Text => print_text(session, outcome),
        }
    }
    Ok(())
}

fn print_text(session: &DeviceSessionState, outcome: &KpiOutcome) {
    let status = if outcome.passed { "PASS" } else { "FAIL" };
    print!("{} ({}) {}: {}", session.display_name, session.dsn, outcome.kind, status);
    match outcome.result.as_ref().filter(|r| !r.is_not_available()) {
        Some(result) => println!(
            " values={} avg={:.3}s median={:.3}s mode={:.3}s tp50={:.3}s tp90={:.3}s lost={} ram={} cpu={}",
            result.values_text(),
            result.average,
            result.median,
            result.mode,
            result.tp50,
            result.tp90,
            result.loss_count,
            result.ram_text(),
            result.cpu_text()
        ),
        None => println!(" ({})", outcome.failure_reason),
    }
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.debug);

    let mut config = KpiConfig::from_file(&args.config)?;
    if let Some(csv) = &args.csv {
        config.kpi_values_csv = csv.clone();
    }
    if let Err(e) = config.validate() {
        anyhow::bail!("Invalid configuration in {}: {}", args.config.display(), e);
    }

    let sink = if args.append {
        CsvResultSink::open(&config.kpi_values_csv)
    } else {
        CsvResultSink::create(&config.kpi_values_csv)
    }
    .with_context(|| format!("Failed to open {}", config.kpi_values_csv.display()))?;

    let channel = AdbChannel::with_program(&args.adb);
    let wait = ThreadWait;

    // One thread per device; each owns its session state and sample records
    let reports: Vec<SessionReport> = thread::scope(|scope| {
        let handles: Vec<_> = args
            .dsn
            .iter()
            .map(|dsn| {
                let (channel, wait, config, sink) = (&channel, &wait, &config, &sink);
                scope.spawn(move || run_session(dsn, channel, wait, config, sink, args.kpi))
            })
            .collect();

        handles
            .into_iter()
            .zip(&args.dsn)
            .map(|(handle, dsn)| {
                handle.join().unwrap_or_else(|_| {
                    tracing::error!(dsn = %dsn, "Device session panicked");
                    SessionReport {
                        dsn: dsn.clone(),
                        session: None,
                        outcomes: Vec::new(),
                    }
                })
            })
            .collect()
    });

    for report in &reports {
        print_report(report, args.format)?;
    }

    let failed: usize = reports.iter().map(SessionReport::failed_runs).sum();
    if failed > 0 {
        anyhow::bail!(
            "{} KPI run(s) failed, see {}",
            failed,
            config.kpi_values_csv.display()
        );
    }
    Ok(())
}
