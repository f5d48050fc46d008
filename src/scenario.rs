use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audit::AuditLog;
use crate::config::CascadeRules;
use crate::error::{EngineError, Result};
use crate::flight::FlightId;
use crate::network::Network;
use crate::propagation::Propagator;

/// Suffix appended to the scenario cause for inbound holds
pub const ARRIVAL_HOLD_SUFFIX: &str = "(arrival hold)";

/// Causes drawn by random chaos
pub const OPERATIONAL_CAUSES: [&str; 8] = [
    "Mechanical inspection",
    "Crew scheduling conflict",
    "Late inbound aircraft",
    "Weather at destination",
    "Air traffic control flow restriction",
    "Baggage loading delay",
    "Fuelling delay",
    "Gate unavailability",
];

/// Named airport-wide disruptions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    JfkSnowstorm,
    OrdThunderstorm,
    LhrAtcStrike,
    AtlGroundStop,
    SfoFog,
}

impl ScenarioId {
    pub fn all() -> &'static [ScenarioId] {
        &[
            ScenarioId::JfkSnowstorm,
            ScenarioId::OrdThunderstorm,
            ScenarioId::LhrAtcStrike,
            ScenarioId::AtlGroundStop,
            ScenarioId::SfoFog,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioId::JfkSnowstorm => "jfk_snowstorm",
            ScenarioId::OrdThunderstorm => "ord_thunderstorm",
            ScenarioId::LhrAtcStrike => "lhr_atc_strike",
            ScenarioId::AtlGroundStop => "atl_ground_stop",
            ScenarioId::SfoFog => "sfo_fog",
        }
    }

    /// The scenario's fixed parameters
    pub fn scenario(&self) -> Scenario {
        match self {
            ScenarioId::JfkSnowstorm => Scenario {
                id: *self,
                name: "JFK Snowstorm",
                airport: "JFK",
                delays: [120, 180, 240],
                cause: "Severe winter storm at JFK",
            },
            ScenarioId::OrdThunderstorm => Scenario {
                id: *self,
                name: "O'Hare Thunderstorms",
                airport: "ORD",
                delays: [60, 90, 120],
                cause: "Thunderstorm cells over Chicago O'Hare",
            },
            ScenarioId::LhrAtcStrike => Scenario {
                id: *self,
                name: "Heathrow ATC Strike",
                airport: "LHR",
                delays: [90, 150, 210],
                cause: "Air traffic control strike at Heathrow",
            },
            ScenarioId::AtlGroundStop => Scenario {
                id: *self,
                name: "Atlanta Ground Stop",
                airport: "ATL",
                delays: [45, 75, 105],
                cause: "Equipment ground stop at Atlanta",
            },
            ScenarioId::SfoFog => Scenario {
                id: *self,
                name: "SFO Fog",
                airport: "SFO",
                delays: [30, 60, 90],
                cause: "Low visibility fog at SFO",
            },
        }
    }
}

impl FromStr for ScenarioId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        ScenarioId::all()
            .iter()
            .copied()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| EngineError::InvalidScenario(s.to_string()))
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of one named scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub name: &'static str,
    pub airport: &'static str,
    /// Candidate departure delays; the first also sets the arrival hold
    pub delays: [u32; 3],
    pub cause: &'static str,
}

impl Scenario {
    /// Half of the first candidate delay
    pub fn arrival_hold_minutes(&self) -> u32 {
        self.delays[0] / 2
    }

    pub fn arrival_hold_cause(&self) -> String {
        format!("{} {}", self.cause, ARRIVAL_HOLD_SUFFIX)
    }

    /// Delay every operating departure by a random candidate, then hold every
    /// operating arrival by half the first candidate. Each pass queries its
    /// flights when it starts, so arrivals already pushed to DELAYED by the
    /// departure pass are not held again.
    pub fn apply(
        &self,
        network: &mut Network,
        log: &mut AuditLog,
        rules: CascadeRules,
        now: DateTime<Utc>,
        rng: &mut impl Rng,
    ) -> Result<()> {
        info!(scenario = %self.id, airport = self.airport, "applying scenario");

        for flight_id in network.departures_from(self.airport) {
            let delay = *self
                .delays
                .choose(rng)
                .ok_or_else(|| EngineError::config("scenario without delays"))?;
            debug!(flight_id, delay, "scenario departure delay");
            Propagator::new(network, log, rules, now).propagate_root(flight_id, delay, self.cause)?;
        }

        let hold = self.arrival_hold_minutes();
        let hold_cause = self.arrival_hold_cause();
        for flight_id in network.arrivals_into(self.airport) {
            debug!(flight_id, hold, "scenario arrival hold");
            Propagator::new(network, log, rules, now).propagate_root(flight_id, hold, &hold_cause)?;
        }
        Ok(())
    }
}

/// A random disruption: which flight, how long, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomDisruption {
    pub flight_id: FlightId,
    pub delay_minutes: u32,
    pub cause: String,
}

/// Pick a random operating flight.
pub fn pick_flight(network: &Network, rng: &mut impl Rng) -> Result<FlightId> {
    network
        .operating_flights()
        .choose(rng)
        .copied()
        .ok_or(EngineError::NoEligibleFlight)
}

/// Uniform delay in `min..=max` minutes.
pub fn pick_delay(min: u32, max: u32, rng: &mut impl Rng) -> u32 {
    Uniform::new_inclusive(min, max.max(min)).sample(rng)
}

pub fn pick_cause(rng: &mut impl Rng) -> &'static str {
    OPERATIONAL_CAUSES[rng.gen_range(0..OPERATIONAL_CAUSES.len())]
}

/// Draw a full random disruption.
pub fn random_disruption(
    network: &Network,
    min_delay: u32,
    max_delay: u32,
    rng: &mut impl Rng,
) -> Result<RandomDisruption> {
    let flight_id = pick_flight(network, rng)?;
    Ok(RandomDisruption {
        flight_id,
        delay_minutes: pick_delay(min_delay, max_delay, rng),
        cause: pick_cause(rng).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::fixtures::{airport, at};
    use crate::flight::{Flight, FlightStatus};

    fn jfk_network() -> Network {
        let mut network = Network::new();
        for code in ["JFK", "ORD", "LHR", "MIA"] {
            network.add_airport(airport(code)).unwrap();
        }
        let flights = [
            Flight::new(1, "FC1", None, "JFK", "ORD", at(8, 0), at(10, 0)),
            Flight::new(2, "FC2", None, "JFK", "LHR", at(9, 0), at(16, 0)),
            Flight::new(3, "FC3", None, "JFK", "MIA", at(10, 0), at(13, 0)),
            Flight::new(4, "FC4", None, "ORD", "JFK", at(8, 0), at(10, 0)),
            Flight::new(5, "FC5", None, "LHR", "JFK", at(7, 0), at(14, 0)),
            Flight::new(6, "FC6", None, "MIA", "ORD", at(7, 0), at(10, 0)),
        ];
        for flight in flights {
            network.add_flight(flight).unwrap();
        }
        network
    }

    #[test]
    fn test_parse_scenario_ids() {
        for id in ScenarioId::all() {
            assert_eq!(id.as_str().parse::<ScenarioId>().unwrap(), *id);
        }
        let err = "volcanic_ash".parse::<ScenarioId>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidScenario(ref s) if s == "volcanic_ash"));
    }

    #[test]
    fn test_catalog_has_five_distinct_airports() {
        let mut airports: Vec<&str> = ScenarioId::all()
            .iter()
            .map(|id| id.scenario().airport)
            .collect();
        airports.sort();
        airports.dedup();
        assert_eq!(airports.len(), 5);
    }

    #[test]
    fn test_jfk_snowstorm() {
        let mut network = jfk_network();
        let mut log = AuditLog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let scenario = ScenarioId::JfkSnowstorm.scenario();
        scenario
            .apply(&mut network, &mut log, CascadeRules::default(), at(6, 0), &mut rng)
            .unwrap();

        for id in [1, 2, 3] {
            let flight = network.flight(id).unwrap();
            assert_eq!(flight.status, FlightStatus::Delayed);
            assert!([120, 180, 240].contains(&flight.delay_minutes));
        }
        for id in [4, 5] {
            let flight = network.flight(id).unwrap();
            assert_eq!(flight.delay_minutes, 60);
        }
        let holds: Vec<_> = log
            .entries()
            .iter()
            .filter(|e| e.cause.ends_with("(arrival hold)"))
            .collect();
        assert_eq!(holds.len(), 2);
        assert!(holds.iter().all(|e| e.delay_minutes == 60));

        // Unrelated flight untouched
        assert_eq!(network.flight(6).unwrap().delay_minutes, 0);
    }

    #[test]
    fn test_terminal_flights_ignored() {
        let mut network = jfk_network();
        network.flight_mut(1).unwrap().status = FlightStatus::Landed;
        network.flight_mut(4).unwrap().status = FlightStatus::Cancelled;
        let mut log = AuditLog::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        ScenarioId::JfkSnowstorm
            .scenario()
            .apply(&mut network, &mut log, CascadeRules::default(), at(6, 0), &mut rng)
            .unwrap();

        assert_eq!(network.flight(1).unwrap().delay_minutes, 0);
        assert_eq!(network.flight(4).unwrap().delay_minutes, 0);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_seeded_scenario_is_deterministic() {
        let run = |seed| {
            let mut network = jfk_network();
            let mut log = AuditLog::new();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            ScenarioId::JfkSnowstorm
                .scenario()
                .apply(&mut network, &mut log, CascadeRules::default(), at(6, 0), &mut rng)
                .unwrap();
            network.flights().map(|f| f.delay_minutes).collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_random_disruption_ranges() {
        let network = jfk_network();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..200 {
            let d = random_disruption(&network, 15, 180, &mut rng).unwrap();
            assert!((15..=180).contains(&d.delay_minutes));
            assert!(OPERATIONAL_CAUSES.contains(&d.cause.as_str()));
            assert!(network.flight(d.flight_id).unwrap().status.is_operating());
        }
    }

    #[test]
    fn test_no_operating_flight() {
        let mut network = jfk_network();
        for flight in network.flights_mut() {
            flight.status = FlightStatus::Landed;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(matches!(
            pick_flight(&network, &mut rng),
            Err(EngineError::NoEligibleFlight)
        ));
    }
}
