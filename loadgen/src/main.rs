use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::Parser;
use common::logger::{LogOptions, init_logger};
use loadgen::{
    audit::audit_file,
    client::{DirectSeatApi, HttpSeatApi, SeatApi},
    config::{AuditArgs, Cli, Command, RunArgs},
    metrics::{AggregateReport, RunAggregate},
    orchestrator::LoadOrchestrator,
};
use seats::repository_memory::MemorySeatRepository;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("seat-loadgen", &LogOptions::from_env());

    match Cli::parse().command {
        Command::Run(args) => run(args).await,
        Command::Audit(args) => audit(args),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let api: Arc<dyn SeatApi> = match args.in_process_seats {
        Some(total) => {
            info!(target: "loadgen", total, "racing an in-process seat pool");
            Arc::new(DirectSeatApi::new(Arc::new(MemorySeatRepository::with_seats(total))))
        }
        None => {
            info!(target: "loadgen", base_url = %args.base_url, "racing the HTTP service");
            Arc::new(
                HttpSeatApi::new(&args.base_url, args.request_timeout())
                    .context("failed to build http client")?,
            )
        }
    };

    if args.in_process_seats.is_none() && !args.warmup().is_zero() {
        info!(target: "loadgen", secs = args.warmup_secs, "warming up");
        tokio::time::sleep(args.warmup()).await;
    }

    let orchestrator = LoadOrchestrator::new(
        api,
        args.orchestrator_settings(),
        args.simulator_settings(),
    );
    let runs = orchestrator.run().await;
    let report = AggregateReport::from(&RunAggregate::from_runs(&runs));

    let rendered = if args.json {
        serde_json::to_string_pretty(&report).context("failed to encode report")?
    } else {
        report.to_string()
    };
    println!("{rendered}");

    if let Some(path) = &args.report_file {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{rendered}").with_context(|| format!("failed to write {}", path.display()))?;
    }

    if report.duplicate_grants > 0 {
        bail!("{} seats were granted more than once", report.duplicate_grants);
    }

    Ok(())
}

fn audit(args: AuditArgs) -> anyhow::Result<()> {
    let summary = audit_file(&args.log)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary).context("failed to encode summary")?);
    } else {
        println!("lines:                {} ({} skipped)", summary.lines, summary.skipped);
        println!("success:              {}", summary.successes);
        println!("seat_conflict:        {}", summary.conflicts);
        println!("too many connections: {}", summary.too_many_connections);
        for (status, n) in &summary.reserve_statuses {
            println!("  {status}: {n}");
        }
    }

    if !summary.matches_expected(args.expected) {
        warn!(target: "loadgen", expected = ?args.expected, successes = summary.successes, "success count mismatch");
        bail!(
            "expected {} successful reservations, log shows {}",
            args.expected.unwrap_or_default(),
            summary.successes
        );
    }

    Ok(())
}
