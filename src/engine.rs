/// The disruption engine: the single serialized entry point.
/// Mutations hold the state write lock for one whole transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::audit::{DisruptionEvent, DisruptionLogEntry};
use crate::booking::BookingId;
use crate::chaos_seed::{ChaosSeed, ChaosStream};
use crate::clock::{Clock, WallClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::flight::FlightId;
use crate::lifecycle::{Lifecycle, Transition};
use crate::network::Network;
use crate::propagation::Propagator;
use crate::rebooking::{RebookingMatcher, RebookingSuggestion};
use crate::scenario::{self, ScenarioId};
use crate::snapshot::{
    broken_connections, Snapshot, SnapshotId, SnapshotSummary, WorldMetrics, WorldState,
};
use crate::store::{EngineState, Transaction};

/// A delay trigger. Missing parts are drawn at random.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRequest {
    pub flight_id: Option<FlightId>,
    pub delay_minutes: Option<u32>,
    pub cause: Option<String>,
}

impl DelayRequest {
    /// Random flight, random delay, random cause
    pub fn random() -> Self {
        Self::default()
    }

    pub fn manual(flight_id: FlightId, delay_minutes: u32, cause: &str) -> Self {
        Self {
            flight_id: Some(flight_id),
            delay_minutes: Some(delay_minutes),
            cause: Some(cause.to_string()),
        }
    }
}

/// Result of a mutating operation, ready for the caller to publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerOutcome {
    /// One per log entry appended, in log order
    pub events: Vec<DisruptionEvent>,
    pub world: WorldState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleOutcome {
    pub transitions: Vec<Transition>,
    pub world: WorldState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutcome {
    pub lifecycle: LifecycleOutcome,
    /// Present when autonomous chaos fired on this tick
    pub chaos: Option<TriggerOutcome>,
}

pub struct DisruptionEngine {
    state: RwLock<EngineState>,
    disruption_rng: Mutex<ChaCha8Rng>,
    tick_rng: Mutex<ChaCha8Rng>,
    seed: ChaosSeed,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl DisruptionEngine {
    pub fn new(network: Network, config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let seed = ChaosSeed::from_option(config.chaos.seed);
        info!(
            chaos_seed = seed.value(),
            flights = network.flights().count(),
            "disruption engine ready"
        );
        Ok(Self {
            state: RwLock::new(EngineState::new(network)),
            disruption_rng: Mutex::new(seed.rng(ChaosStream::Disruptions)),
            tick_rng: Mutex::new(seed.rng(ChaosStream::Ticks)),
            seed,
            clock,
            config,
        })
    }

    /// Default config on the wall clock
    pub fn with_defaults(network: Network) -> Result<Self> {
        Self::new(network, EngineConfig::default(), Arc::new(WallClock))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The chaos seed in use, for replaying a run
    pub fn chaos_seed(&self) -> u64 {
        self.seed.value()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ==========================================
    // Triggers
    // ==========================================

    /// Delay one flight and propagate. Omitted parts of the request are drawn
    /// from the chaos RNG; an unknown flight is rejected before anything runs.
    #[instrument(skip(self))]
    pub fn trigger_delay(&self, request: DelayRequest) -> Result<TriggerOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write();

        let (flight_id, delay_minutes, cause) = {
            let mut rng = self.disruption_rng.lock();
            let flight_id = match request.flight_id {
                Some(id) => state.network.flight(id).map(|f| f.id)?,
                None => scenario::pick_flight(&state.network, &mut *rng)?,
            };
            let delay_minutes = request.delay_minutes.unwrap_or_else(|| {
                scenario::pick_delay(
                    self.config.chaos.min_delay_minutes,
                    self.config.chaos.max_delay_minutes,
                    &mut *rng,
                )
            });
            let cause = request
                .cause
                .unwrap_or_else(|| scenario::pick_cause(&mut *rng).to_string());
            (flight_id, delay_minutes, cause)
        };

        info!(flight_id, delay_minutes, cause = %cause, "delay triggered");
        let rules = self.config.cascade;
        let events = Transaction::run(&mut state, |tx| {
            let mark = tx.base_log_len();
            Propagator::new(&mut tx.network, &mut tx.log, rules, now)
                .propagate_root(flight_id, delay_minutes, &cause)?;
            Ok(events_since(tx.log.since(mark)))
        })?;

        Ok(TriggerOutcome {
            events,
            world: self.build_world(&state, now)?,
        })
    }

    /// Apply a named scenario as one atomic unit.
    #[instrument(skip(self))]
    pub fn trigger_scenario(&self, scenario_id: &str) -> Result<TriggerOutcome> {
        let scenario = scenario_id.parse::<ScenarioId>()?.scenario();
        let now = self.clock.now();
        let mut state = self.state.write();
        let rules = self.config.cascade;

        let events = Transaction::run(&mut state, |tx| {
            let mark = tx.base_log_len();
            let mut rng = self.disruption_rng.lock();
            scenario.apply(&mut tx.network, &mut tx.log, rules, now, &mut *rng)?;
            Ok(events_since(tx.log.since(mark)))
        })?;

        info!(scenario = %scenario.id, events = events.len(), "scenario applied");
        Ok(TriggerOutcome {
            events,
            world: self.build_world(&state, now)?,
        })
    }

    /// Put every flight back on schedule, confirm every booking and clear the
    /// log. Snapshots are kept.
    #[instrument(skip(self))]
    pub fn reset_simulation(&self) -> Result<TriggerOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write();

        Transaction::run(&mut state, |tx| {
            tx.network.flights_mut().for_each(|f| f.reset());
            tx.network.bookings_mut().for_each(|b| b.reset());
            tx.log.clear();
            Ok(())
        })?;

        info!("simulation reset");
        Ok(TriggerOutcome {
            events: Vec::new(),
            world: self.build_world(&state, now)?,
        })
    }

    // ==========================================
    // Snapshots
    // ==========================================

    #[instrument(skip(self))]
    pub fn save_snapshot(&self, label: &str) -> Result<SnapshotSummary> {
        let now = self.clock.now();
        let summary = self.state.write().save_snapshot(label, now)?;
        info!(snapshot_id = summary.id, label, "snapshot saved");
        Ok(summary)
    }

    pub fn list_snapshots(&self) -> Vec<SnapshotSummary> {
        self.state.read().snapshots().iter().map(Snapshot::summary).collect()
    }

    pub fn load_snapshot(&self, id: SnapshotId) -> Result<Snapshot> {
        self.state.read().snapshot(id).cloned()
    }

    /// Replay a stored snapshot onto the network. The log is left as is.
    #[instrument(skip(self))]
    pub fn restore_snapshot(&self, id: SnapshotId) -> Result<TriggerOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let snapshot = state.snapshot(id)?.clone();

        Transaction::run(&mut state, |tx| snapshot.restore_into(&mut tx.network))?;

        info!(snapshot_id = id, label = %snapshot.label, "snapshot restored");
        Ok(TriggerOutcome {
            events: Vec::new(),
            world: self.build_world(&state, now)?,
        })
    }

    // ==========================================
    // Reads
    // ==========================================

    pub fn world_state(&self) -> Result<WorldState> {
        let state = self.state.read();
        self.build_world(&state, self.clock.now())
    }

    pub fn suggest_rebookings(&self) -> Result<Vec<RebookingSuggestion>> {
        let state = self.state.read();
        RebookingMatcher::new(self.config.rebooking_candidates)
            .suggest(&state.network, self.clock.now())
    }

    pub fn disruption_log(&self) -> Vec<DisruptionLogEntry> {
        self.state.read().log().entries().to_vec()
    }

    /// Copy of the current network
    pub fn network(&self) -> Network {
        self.state.read().network.clone()
    }

    /// Run a closure against the current network under the read lock
    pub fn read_network<T>(&self, f: impl FnOnce(&Network) -> T) -> T {
        f(&self.state.read().network)
    }

    // ==========================================
    // Recovery and time
    // ==========================================

    #[instrument(skip(self))]
    pub fn accept_rebooking(
        &self,
        booking_id: BookingId,
        alternative_flight_id: FlightId,
    ) -> Result<TriggerOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let matcher = RebookingMatcher::new(self.config.rebooking_candidates);

        Transaction::run(&mut state, |tx| {
            matcher.accept(&mut tx.network, booking_id, alternative_flight_id)
        })?;

        Ok(TriggerOutcome {
            events: Vec::new(),
            world: self.build_world(&state, now)?,
        })
    }

    /// Move every flight through the lifecycle states its times call for.
    #[instrument(skip(self))]
    pub fn advance_lifecycle(&self) -> Result<LifecycleOutcome> {
        let now = self.clock.now();
        let mut state = self.state.write();
        let lifecycle = Lifecycle::new(self.config.boarding_window_minutes);

        let transitions =
            Transaction::run(&mut state, |tx| Ok(lifecycle.advance(&mut tx.network, now)))?;
        if !transitions.is_empty() {
            info!(transitions = transitions.len(), "lifecycle advanced");
        }

        Ok(LifecycleOutcome {
            transitions,
            world: self.build_world(&state, now)?,
        })
    }

    /// One periodic tick: advance the lifecycle, then maybe fire random chaos.
    /// Each half is its own serialized unit.
    #[instrument(skip(self))]
    pub fn tick(&self) -> Result<TickOutcome> {
        let lifecycle = self.advance_lifecycle()?;

        let fire = self.config.chaos.autonomous
            && self
                .tick_rng
                .lock()
                .gen_bool(self.config.chaos.probability_per_tick);
        let chaos = if fire {
            match self.trigger_delay(DelayRequest::random()) {
                Ok(outcome) => Some(outcome),
                Err(EngineError::NoEligibleFlight) => None,
                Err(err) => return Err(err),
            }
        } else {
            None
        };

        Ok(TickOutcome { lifecycle, chaos })
    }

    fn build_world(&self, state: &EngineState, now: DateTime<Utc>) -> Result<WorldState> {
        Ok(WorldState {
            flights: state.network.flights().cloned().collect(),
            broken_connections: broken_connections(&state.network)?,
            metrics: WorldMetrics::compute(&state.network),
            recent_disruptions: state.log.recent(self.config.recent_disruptions),
            generated_at: now,
        })
    }
}

fn events_since(entries: &[DisruptionLogEntry]) -> Vec<DisruptionEvent> {
    entries.iter().map(DisruptionEvent::from).collect()
}
