use std::collections::HashSet;
use std::sync::Arc;

use seats::UserId;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::client::SeatApi;
use crate::model::ClientRun;
use crate::simulator::{ClientSimulator, SimulatorSettings};

#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    pub clients: usize,
    pub first_user_id: UserId,
    /// Base seed; each user gets `seed ^ user_id`. Drawn at random when absent.
    pub seed: Option<u64>,
}

/// Starts every simulated user at once and collects their runs after all of
/// them have finished.
pub struct LoadOrchestrator {
    api: Arc<dyn SeatApi>,
    settings: OrchestratorSettings,
    simulator: Arc<SimulatorSettings>,
}

impl LoadOrchestrator {
    pub fn new(
        api: Arc<dyn SeatApi>,
        settings: OrchestratorSettings,
        simulator: SimulatorSettings,
    ) -> Self {
        Self {
            api,
            settings,
            simulator: Arc::new(simulator),
        }
    }

    /// Returns one run per user id, ordered by user id.
    #[instrument(skip(self), fields(clients = self.settings.clients), target = "loadgen")]
    pub async fn run(&self) -> Vec<ClientRun> {
        let clients = self.settings.clients;
        let seed = self.settings.seed.unwrap_or_else(rand::random);
        info!(target: "loadgen", seed, "starting simulators");

        // Room for every run so no simulator waits on the collector.
        let (tx, mut rx) = mpsc::channel::<ClientRun>(clients.max(1));
        let mut tasks = JoinSet::new();

        for user_id in self.user_ids() {
            let simulator = ClientSimulator::new(
                user_id,
                self.api.clone(),
                self.simulator.clone(),
                seed ^ user_id as u64,
            );
            let tx = tx.clone();

            tasks.spawn(async move {
                let run = simulator.run().await;
                if tx.send(run).await.is_err() {
                    warn!(target: "loadgen", user_id, "collector gone, run dropped");
                }
            });
        }
        drop(tx);

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!(target: "loadgen", error = %e, "simulator task failed");
            }
        }

        let mut runs = Vec::with_capacity(clients);
        while let Some(run) = rx.recv().await {
            runs.push(run);
        }

        let reported: HashSet<UserId> = runs.iter().map(|r| r.user_id).collect();
        for user_id in self.user_ids() {
            if !reported.contains(&user_id) {
                runs.push(ClientRun::lost(user_id));
            }
        }

        runs.sort_by_key(|r| r.user_id);
        info!(target: "loadgen", runs = runs.len(), "all simulators finished");

        runs
    }

    fn user_ids(&self) -> impl Iterator<Item = UserId> + use<> {
        let first = self.settings.first_user_id;
        (0..self.settings.clients as i64).map(move |i| first + i)
    }
}
