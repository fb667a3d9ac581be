use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use loadgen::client::HttpSeatApi;
use loadgen::metrics::{AggregateReport, RunAggregate};
use loadgen::model::Termination;
use loadgen::orchestrator::{LoadOrchestrator, OrchestratorSettings};
use loadgen::retry::DiscoveryRetry;
use loadgen::simulator::SimulatorSettings;
use seats::repository_memory::MemorySeatRepository;
use seats::{SeatRepository, SeatStatus};
use server::http::{AppState, build_router};
use server::service::ReservationService;
use tokio::net::TcpListener;

async fn spawn_server(total_seats: u32) -> (String, Arc<MemorySeatRepository>) {
    let repo = Arc::new(MemorySeatRepository::with_seats(total_seats));
    let service = Arc::new(ReservationService::new(repo.clone(), None));
    let app = build_router(AppState::new(service));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), repo)
}

fn settings(clients: usize) -> OrchestratorSettings {
    OrchestratorSettings {
        clients,
        first_user_id: 1000,
        seed: Some(2024),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn users_drain_the_pool_over_http() {
    let (base_url, repo) = spawn_server(60).await;
    let api = Arc::new(HttpSeatApi::new(&base_url, Duration::from_secs(5)).unwrap());

    let sim = SimulatorSettings {
        backoff_max: Duration::from_millis(5),
        ..SimulatorSettings::default()
    };
    let runs = LoadOrchestrator::new(api, settings(30), sim).run().await;

    assert_eq!(runs.len(), 30);
    assert!(runs.iter().all(|r| !r.attempts.is_empty()));

    let report = AggregateReport::from(&RunAggregate::from_runs(&runs));
    assert_eq!(report.successes.count, 60);
    assert_eq!(report.unique_seats_won, 60);
    assert_eq!(report.duplicate_grants, 0);
    assert!(report.successes.avg_latency_ms.is_some());
    // Only conflicts are possible against a healthy pool.
    assert!(report.rejections_by_status.keys().all(|status| *status == 409));

    assert!(repo.list_available(None).await.unwrap().is_empty());

    let mut owners = HashSet::new();
    for run in &runs {
        for seat in &run.seats_won {
            let stored = repo.fetch(*seat).await.unwrap().unwrap();
            assert_eq!(stored.status, SeatStatus::Reserved);
            assert_eq!(stored.owner_id, Some(run.user_id));
            owners.insert(*seat);
        }
    }
    assert_eq!(owners.len(), 60);
}

#[tokio::test]
async fn unreachable_service_ends_in_discovery_give_up() {
    // Bind then drop to get a port nothing listens on.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = Arc::new(HttpSeatApi::new(&format!("http://{addr}"), Duration::from_millis(500)).unwrap());
    let sim = SimulatorSettings {
        discovery: DiscoveryRetry {
            max_consecutive_failures: Some(2),
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        },
        ..SimulatorSettings::default()
    };

    let runs = LoadOrchestrator::new(api, settings(4), sim).run().await;
    let report = AggregateReport::from(&RunAggregate::from_runs(&runs));

    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|r| r.termination == Termination::DiscoveryGaveUp));
    assert_eq!(report.discovery_failures, 8);
    assert_eq!(report.request_failures.count, 4);
    assert_eq!(report.successes.count, 0);
}

#[tokio::test]
async fn closed_store_makes_users_give_up() {
    let (base_url, repo) = spawn_server(5).await;
    let api = Arc::new(HttpSeatApi::new(&base_url, Duration::from_secs(5)).unwrap());

    // Listing answers 500 once the store is closed.
    repo.close().await;

    let sim = SimulatorSettings {
        discovery: DiscoveryRetry {
            max_consecutive_failures: Some(1),
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        },
        ..SimulatorSettings::default()
    };
    let runs = LoadOrchestrator::new(api, settings(3), sim).run().await;

    assert!(runs.iter().all(|r| r.termination == Termination::DiscoveryGaveUp));
    assert!(runs.iter().all(|r| r.discovery_failures == 1));
}
