use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use seats::UserId;
use tokio::time::Instant;

use crate::orchestrator::OrchestratorSettings;
use crate::retry::DiscoveryRetry;
use crate::simulator::SimulatorSettings;

#[derive(Debug, Parser)]
#[clap(name = "seat-loadgen", version, about = "Concurrent load harness for the seat reservation service")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Race simulated users for every seat and print the aggregate
    Run(RunArgs),
    /// Count reservation outcomes in a server JSON log
    Audit(AuditArgs),
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Base URL of the reservation service
    #[clap(long, env = "LOADGEN_BASE_URL", default_value = "http://localhost:8080")]
    pub base_url: String,

    /// Skip HTTP and race against an in-process pool of this many seats (ignores --base-url)
    #[clap(long)]
    pub in_process_seats: Option<u32>,

    /// Number of simulated users
    #[clap(long, default_value_t = 5000)]
    pub clients: usize,

    /// User id of the first simulated user; the rest are consecutive
    #[clap(long, default_value_t = 1000)]
    pub first_user_id: UserId,

    /// Per-request timeout (ms)
    #[clap(long, default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Candidates tried per discovery round (at least 1)
    #[clap(long, default_value_t = 3, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_attempts: u64,

    /// Upper bound of the random pause after a rejected attempt (ms)
    #[clap(long, default_value_t = 100)]
    pub backoff_max_ms: u64,

    /// Consecutive discovery failures before a user gives up (unbounded if unset)
    #[clap(long)]
    pub discovery_retries: Option<u32>,

    /// First delay after a failed discovery (ms); doubles per failure
    #[clap(long, default_value_t = 10)]
    pub discovery_backoff_ms: u64,

    /// Cap for the discovery delay (ms)
    #[clap(long, default_value_t = 1000)]
    pub discovery_backoff_max_ms: u64,

    /// Stop every user after this many seconds
    #[clap(long)]
    pub deadline_secs: Option<u64>,

    /// Base RNG seed for reproducible candidate order
    #[clap(long)]
    pub seed: Option<u64>,

    /// Wait before starting, so the service can finish booting
    #[clap(long, default_value_t = 10)]
    pub warmup_secs: u64,

    /// Append the report to this file as well
    #[clap(long)]
    pub report_file: Option<PathBuf>,

    /// Print the report as JSON
    #[clap(long)]
    pub json: bool,
}

impl RunArgs {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_secs(self.warmup_secs)
    }

    pub fn orchestrator_settings(&self) -> OrchestratorSettings {
        OrchestratorSettings {
            clients: self.clients,
            first_user_id: self.first_user_id,
            seed: self.seed,
        }
    }

    /// The deadline is measured from the moment this is called.
    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            max_attempts_per_round: usize::try_from(self.max_attempts).unwrap_or(usize::MAX),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
            discovery: DiscoveryRetry {
                max_consecutive_failures: self.discovery_retries,
                initial_delay: Duration::from_millis(self.discovery_backoff_ms),
                max_delay: Duration::from_millis(self.discovery_backoff_max_ms),
            },
            deadline: self
                .deadline_secs
                .map(|secs| Instant::now() + Duration::from_secs(secs)),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct AuditArgs {
    /// Server log file (one JSON event per line)
    #[clap(long)]
    pub log: PathBuf,

    /// Expected number of successful reservations, usually the seat count
    #[clap(long)]
    pub expected: Option<u64>,

    /// Print the summary as JSON
    #[clap(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["seat-loadgen", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Command::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn run_defaults_follow_the_reference_workload() {
        let args = run_args(&[]);

        assert_eq!(args.clients, 5000);
        assert_eq!(args.first_user_id, 1000);
        assert_eq!(args.request_timeout(), Duration::from_secs(5));
        assert_eq!(args.warmup(), Duration::from_secs(10));

        let sim = args.simulator_settings();
        assert_eq!(sim.max_attempts_per_round, 3);
        assert_eq!(sim.backoff_max, Duration::from_millis(100));
        assert_eq!(sim.discovery.max_consecutive_failures, None);
        assert!(sim.deadline.is_none());
    }

    #[test]
    fn run_flags_override_defaults() {
        let args = run_args(&[
            "--clients",
            "12",
            "--seed",
            "9",
            "--discovery-retries",
            "4",
            "--deadline-secs",
            "30",
            "--in-process-seats",
            "100",
        ]);

        assert_eq!(args.orchestrator_settings().clients, 12);
        assert_eq!(args.orchestrator_settings().seed, Some(9));
        assert_eq!(args.in_process_seats, Some(100));

        let sim = args.simulator_settings();
        assert_eq!(sim.discovery.max_consecutive_failures, Some(4));
        assert!(sim.deadline.is_some());
    }

    #[test]
    fn zero_attempts_per_round_is_rejected() {
        assert!(Cli::try_parse_from(["seat-loadgen", "run", "--max-attempts", "0"]).is_err());
        assert_eq!(run_args(&["--max-attempts", "1"]).simulator_settings().max_attempts_per_round, 1);
    }

    #[test]
    fn audit_requires_log_path() {
        assert!(Cli::try_parse_from(["seat-loadgen", "audit"]).is_err());

        let cli = Cli::parse_from(["seat-loadgen", "audit", "--log", "server.log", "--expected", "10000"]);
        match cli.command {
            Command::Audit(args) => {
                assert_eq!(args.log, PathBuf::from("server.log"));
                assert_eq!(args.expected, Some(10_000));
            }
            other => panic!("expected audit, got {other:?}"),
        }
    }
}
