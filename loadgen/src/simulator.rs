use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use seats::UserId;
use seats::wire::ReserveRequest;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

use crate::client::SeatApi;
use crate::model::{AttemptResult, ClientRun, Termination};
use crate::retry::DiscoveryRetry;

/// Knobs shared by every simulated user in a run.
#[derive(Clone, Debug)]
pub struct SimulatorSettings {
    /// Candidates tried per discovery round. Zero is treated as one.
    pub max_attempts_per_round: usize,
    /// Upper bound (exclusive) of the random pause after a rejection.
    pub backoff_max: Duration,
    pub discovery: DiscoveryRetry,
    pub deadline: Option<Instant>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            max_attempts_per_round: 3,
            backoff_max: Duration::from_millis(100),
            discovery: DiscoveryRetry::default(),
            deadline: None,
        }
    }
}

/// One simulated user: discovers, shuffles, tries a few seats, repeats until
/// the pool is empty.
pub struct ClientSimulator {
    user_id: UserId,
    api: Arc<dyn SeatApi>,
    settings: Arc<SimulatorSettings>,
    rng: StdRng,
}

impl ClientSimulator {
    pub fn new(
        user_id: UserId,
        api: Arc<dyn SeatApi>,
        settings: Arc<SimulatorSettings>,
        seed: u64,
    ) -> Self {
        Self {
            user_id,
            api,
            settings,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[instrument(skip(self), fields(user_id = self.user_id), level = "debug")]
    pub async fn run(mut self) -> ClientRun {
        let mut run = ClientRun::new(self.user_id);
        let mut failure_streak = 0u32;

        run.termination = loop {
            if self.past_deadline() {
                break Termination::DeadlineReached;
            }

            let mut candidates = match self.api.list_available().await {
                Ok(seats) => {
                    failure_streak = 0;
                    seats
                }
                Err(e) => {
                    run.discovery_failures += 1;
                    failure_streak += 1;
                    debug!(error = %e, failure_streak, "discovery failed");

                    if self.settings.discovery.exhausted(failure_streak) {
                        break Termination::DiscoveryGaveUp;
                    }
                    self.pause(self.settings.discovery.delay_for(failure_streak))
                        .await;
                    continue;
                }
            };

            if candidates.is_empty() {
                break Termination::PoolExhausted;
            }

            candidates.shuffle(&mut self.rng);

            for seat_id in candidates
                .into_iter()
                .take(self.settings.max_attempts_per_round.max(1))
            {
                let req = ReserveRequest {
                    user_id: self.user_id,
                    seat_id,
                };

                let started = Instant::now();
                let status = match self.api.reserve(req).await {
                    Ok(status) => status,
                    Err(e) => {
                        run.discarded_transport_failures += 1;
                        debug!(seat_id, error = %e, "reserve got no response");
                        continue;
                    }
                };

                let attempt = AttemptResult::responded(seat_id, status, started.elapsed());
                let won = attempt.is_success();
                run.attempts.push(attempt);

                if won {
                    debug!(seat_id, "seat won");
                    run.seats_won.push(seat_id);
                    break;
                }

                let backoff = self.random_backoff();
                self.pause(backoff).await;
            }
        };

        run.ensure_nonempty();
        run
    }

    fn random_backoff(&mut self) -> Duration {
        let max = self.settings.backoff_max;
        if max.is_zero() {
            return Duration::ZERO;
        }
        self.rng.gen_range(Duration::ZERO..max)
    }

    fn past_deadline(&self) -> bool {
        self.settings
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    async fn pause(&self, delay: Duration) {
        if delay.is_zero() {
            return;
        }
        let delay = match self.settings.deadline {
            Some(deadline) => delay.min(deadline.saturating_duration_since(Instant::now())),
            None => delay,
        };
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use seats::SeatId;

    use super::*;
    use crate::client::ClientError;
    use crate::model::AttemptOutcome;

    /// Replays canned responses and records which seats were asked for.
    #[derive(Default)]
    struct ScriptedApi {
        listings: Mutex<VecDeque<Result<Vec<SeatId>, ()>>>,
        replies: Mutex<VecDeque<Result<u16, ()>>>,
        reserved: Mutex<Vec<SeatId>>,
    }

    impl ScriptedApi {
        fn new(listings: Vec<Result<Vec<SeatId>, ()>>, replies: Vec<Result<u16, ()>>) -> Self {
            Self {
                listings: Mutex::new(listings.into()),
                replies: Mutex::new(replies.into()),
                reserved: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl SeatApi for ScriptedApi {
        async fn list_available(&self) -> Result<Vec<SeatId>, ClientError> {
            match self.listings.lock().unwrap().pop_front() {
                Some(Ok(seats)) => Ok(seats),
                Some(Err(())) => Err(ClientError::Status(503)),
                None => Ok(Vec::new()),
            }
        }

        async fn reserve(&self, req: ReserveRequest) -> Result<u16, ClientError> {
            self.reserved.lock().unwrap().push(req.seat_id);
            match self.replies.lock().unwrap().pop_front() {
                Some(Ok(status)) => Ok(status),
                Some(Err(())) | None => Err(ClientError::Backend("connection reset".into())),
            }
        }
    }

    fn settings() -> Arc<SimulatorSettings> {
        Arc::new(SimulatorSettings {
            backoff_max: Duration::ZERO,
            discovery: DiscoveryRetry {
                initial_delay: Duration::ZERO,
                ..DiscoveryRetry::default()
            },
            ..SimulatorSettings::default()
        })
    }

    fn simulator(api: &Arc<ScriptedApi>, settings: Arc<SimulatorSettings>) -> ClientSimulator {
        ClientSimulator::new(1000, api.clone(), settings, 7)
    }

    #[tokio::test]
    async fn empty_pool_yields_single_synthetic_failure() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(vec![])], vec![]));

        let run = simulator(&api, settings()).run().await;

        assert_eq!(run.termination, Termination::PoolExhausted);
        assert_eq!(run.attempts.len(), 1);
        assert_eq!(
            run.attempts[0].outcome,
            AttemptOutcome::TransportFailure {
                error: "user 1000: no request succeeded".into()
            }
        );
        assert!(api.reserved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stops_round_on_success_and_tries_at_most_three() {
        let api = Arc::new(ScriptedApi::new(
            vec![Ok(vec![1, 2, 3, 4, 5]), Ok(vec![6, 7, 8, 9])],
            vec![Ok(409), Ok(409), Ok(409), Ok(409), Ok(200)],
        ));

        let run = simulator(&api, settings()).run().await;

        // Round one: three conflicts. Round two: conflict, then a win.
        assert_eq!(api.reserved.lock().unwrap().len(), 5);
        assert_eq!(run.attempts.len(), 5);
        assert!(run.attempts[4].is_success());
        assert!(run.attempts.iter().all(|a| a.latency().is_some()));
        assert_eq!(run.seats_won.len(), 1);
        assert!((6..=9).contains(&run.seats_won[0]));
        assert_eq!(run.termination, Termination::PoolExhausted);
    }

    #[tokio::test]
    async fn zero_attempts_per_round_still_tries_one_seat() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(vec![1, 2]), Ok(vec![2])], vec![Ok(200), Ok(200)]));
        let settings = Arc::new(SimulatorSettings {
            max_attempts_per_round: 0,
            ..(*settings()).clone()
        });

        let run = tokio::time::timeout(Duration::from_secs(5), simulator(&api, settings).run())
            .await
            .expect("simulator must finish");

        assert_eq!(api.reserved.lock().unwrap().len(), 2);
        assert_eq!(run.seats_won.len(), 2);
        assert_eq!(run.termination, Termination::PoolExhausted);
    }

    #[tokio::test]
    async fn transport_failures_are_counted_but_not_recorded() {
        let api = Arc::new(ScriptedApi::new(
            vec![Ok(vec![1, 2, 3])],
            vec![Err(()), Ok(404), Err(())],
        ));

        let run = simulator(&api, settings()).run().await;

        assert_eq!(run.discarded_transport_failures, 2);
        assert_eq!(run.attempts.len(), 1);
        assert_eq!(run.attempts[0].outcome, AttemptOutcome::Rejected { status: 404 });
    }

    #[tokio::test]
    async fn discovery_failures_retry_until_listing_succeeds() {
        let api = Arc::new(ScriptedApi::new(
            vec![Err(()), Err(()), Ok(vec![4])],
            vec![Ok(200)],
        ));

        let run = simulator(&api, settings()).run().await;

        assert_eq!(run.discovery_failures, 2);
        assert_eq!(run.seats_won, vec![4]);
    }

    #[tokio::test]
    async fn bounded_discovery_gives_up() {
        let api = Arc::new(ScriptedApi::new(vec![Err(()), Err(()), Err(())], vec![]));
        let settings = Arc::new(SimulatorSettings {
            discovery: DiscoveryRetry {
                initial_delay: Duration::ZERO,
                ..DiscoveryRetry::bounded(2)
            },
            ..SimulatorSettings::default()
        });

        let run = simulator(&api, settings).run().await;

        assert_eq!(run.termination, Termination::DiscoveryGaveUp);
        assert_eq!(run.discovery_failures, 2);
        assert_eq!(run.attempts.len(), 1);
    }

    #[tokio::test]
    async fn elapsed_deadline_stops_before_any_call() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(vec![1])], vec![Ok(200)]));
        let settings = Arc::new(SimulatorSettings {
            deadline: Some(Instant::now()),
            ..SimulatorSettings::default()
        });

        let run = simulator(&api, settings).run().await;

        assert_eq!(run.termination, Termination::DeadlineReached);
        assert!(api.reserved.lock().unwrap().is_empty());
        assert_eq!(run.attempts.len(), 1);
    }

    #[tokio::test]
    async fn same_seed_picks_same_candidates() {
        let listing: Vec<SeatId> = (1..=50).collect();
        let mut picks = Vec::new();

        for _ in 0..2 {
            let api = Arc::new(ScriptedApi::new(
                vec![Ok(listing.clone())],
                vec![Ok(409), Ok(409), Ok(409)],
            ));
            simulator(&api, settings()).run().await;
            picks.push(api.reserved.lock().unwrap().clone());
        }

        assert_eq!(picks[0].len(), 3);
        assert_eq!(picks[0], picks[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_backoff_stays_below_bound() {
        let api = Arc::new(ScriptedApi::new(vec![Ok(vec![1])], vec![Ok(409)]));
        let settings = Arc::new(SimulatorSettings {
            backoff_max: Duration::from_millis(100),
            ..SimulatorSettings::default()
        });

        let started = Instant::now();
        simulator(&api, settings).run().await;

        assert!(started.elapsed() < Duration::from_millis(100));
    }
}
