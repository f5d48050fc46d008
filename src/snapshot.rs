/// World-state reads and labelled, write-once snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::DisruptionLogEntry;
use crate::booking::{BookingId, BookingStatus, PassengerId};
use crate::error::{EngineError, Result};
use crate::flight::{minutes_between, Flight, FlightId, FlightStatus};
use crate::network::Network;

pub type SnapshotId = u32;

/// Aggregate disruption figures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMetrics {
    pub delayed_flights: u32,
    pub missed_connections: u32,
    /// Sum of delay across DELAYED flights only
    pub total_delay_minutes: u64,
    pub stranded_passengers: u32,
}

impl WorldMetrics {
    pub fn compute(network: &Network) -> Self {
        let delayed: Vec<&Flight> = network
            .flights()
            .filter(|f| f.status == FlightStatus::Delayed)
            .collect();
        Self {
            delayed_flights: delayed.len() as u32,
            missed_connections: network.missed_bookings().count() as u32,
            total_delay_minutes: delayed.iter().map(|f| f.delay_minutes as u64).sum(),
            stranded_passengers: network.stranded_passengers().len() as u32,
        }
    }
}

/// Both legs of a connection that broke
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenConnection {
    pub booking_id: BookingId,
    pub passenger_id: PassengerId,
    pub passenger_name: String,
    pub inbound_flight_id: FlightId,
    pub inbound_flight_number: String,
    pub inbound_arrival: DateTime<Utc>,
    pub onward_booking_id: BookingId,
    pub onward_flight_id: FlightId,
    pub onward_flight_number: String,
    pub onward_departure: DateTime<Utc>,
    /// Negative when the onward flight leaves before the inbound lands
    pub connection_minutes: i64,
}

/// Every MISSED_CONNECTION booking whose onward leg is also missed.
pub fn broken_connections(network: &Network) -> Result<Vec<BrokenConnection>> {
    let mut broken = Vec::new();
    for booking in network.missed_bookings() {
        let Some(onward_id) = booking.next_booking_id else {
            continue;
        };
        let onward = network.booking(onward_id).map_err(|_| {
            EngineError::storage(format!(
                "booking {} links to missing booking {onward_id}",
                booking.id
            ))
        })?;
        if onward.status != BookingStatus::MissedConnection {
            continue;
        }
        let inbound_flight = network.flight(booking.flight_id)?;
        let onward_flight = network.flight(onward.flight_id)?;
        let passenger = network.passenger(booking.passenger_id)?;

        broken.push(BrokenConnection {
            booking_id: booking.id,
            passenger_id: passenger.id,
            passenger_name: passenger.name.clone(),
            inbound_flight_id: inbound_flight.id,
            inbound_flight_number: inbound_flight.flight_number.clone(),
            inbound_arrival: inbound_flight.effective_arrival(),
            onward_booking_id: onward.id,
            onward_flight_id: onward_flight.id,
            onward_flight_number: onward_flight.flight_number.clone(),
            onward_departure: onward_flight.effective_departure(),
            connection_minutes: minutes_between(
                onward_flight.effective_departure(),
                inbound_flight.effective_arrival(),
            ),
        });
    }
    Ok(broken)
}

/// What callers render and publish after every operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub flights: Vec<Flight>,
    pub broken_connections: Vec<BrokenConnection>,
    pub metrics: WorldMetrics,
    /// Newest first
    pub recent_disruptions: Vec<DisruptionLogEntry>,
    pub generated_at: DateTime<Utc>,
}

/// Flight and status of one booking at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingState {
    pub booking_id: BookingId,
    pub flight_id: FlightId,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub label: String,
    pub flights: Vec<Flight>,
    pub broken_connections: Vec<BrokenConnection>,
    pub metrics: WorldMetrics,
    #[serde(default)]
    pub bookings: Vec<BookingState>,
    pub created_at: DateTime<Utc>,
}

/// Listing entry, without the heavy payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub label: String,
    pub metrics: WorldMetrics,
    pub created_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn capture(
        id: SnapshotId,
        label: &str,
        network: &Network,
        created_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id,
            label: label.to_string(),
            flights: network.flights().cloned().collect(),
            broken_connections: broken_connections(network)?,
            metrics: WorldMetrics::compute(network),
            bookings: network
                .bookings()
                .map(|b| BookingState {
                    booking_id: b.id,
                    flight_id: b.flight_id,
                    status: b.status,
                })
                .collect(),
            created_at,
        })
    }

    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            label: self.label.clone(),
            metrics: self.metrics,
            created_at: self.created_at,
        }
    }

    /// Write the captured flight and booking state back onto `network`.
    /// Every referenced entity must still exist; otherwise nothing is written.
    pub fn restore_into(&self, network: &mut Network) -> Result<()> {
        for flight in &self.flights {
            network.flight(flight.id)?;
        }
        for state in &self.bookings {
            network.booking(state.booking_id)?;
            network.flight(state.flight_id)?;
        }

        for flight in &self.flights {
            let target = network.flight_mut(flight.id)?;
            target.actual_departure = flight.actual_departure;
            target.actual_arrival = flight.actual_arrival;
            target.delay_minutes = flight.delay_minutes;
            target.status = flight.status;
        }
        for state in &self.bookings {
            let booking = network.booking_mut(state.booking_id)?;
            booking.flight_id = state.flight_id;
            booking.status = state.status;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, demo_network};

    /// Demo network with passenger 1's JFK-ORD-ATL connection broken
    fn disrupted() -> Network {
        let mut network = demo_network().unwrap();
        network.flight_mut(1).unwrap().apply_delay(90).unwrap();
        network.flight_mut(4).unwrap().apply_delay(30).unwrap();
        for id in [1, 2] {
            network.booking_mut(id).unwrap().status = BookingStatus::MissedConnection;
        }
        network
    }

    #[test]
    fn test_metrics() {
        let metrics = WorldMetrics::compute(&disrupted());
        assert_eq!(metrics.delayed_flights, 2);
        assert_eq!(metrics.total_delay_minutes, 120);
        assert_eq!(metrics.missed_connections, 2);
        assert_eq!(metrics.stranded_passengers, 1);
    }

    #[test]
    fn test_metrics_ignore_delay_on_landed_flights() {
        let mut network = disrupted();
        network.flight_mut(4).unwrap().status = FlightStatus::Landed;
        let metrics = WorldMetrics::compute(&network);
        assert_eq!(metrics.delayed_flights, 1);
        assert_eq!(metrics.total_delay_minutes, 90);
    }

    #[test]
    fn test_broken_connection_describes_both_legs() {
        let network = disrupted();
        let broken = broken_connections(&network).unwrap();
        assert_eq!(broken.len(), 1);

        let b = &broken[0];
        assert_eq!(b.inbound_flight_id, 1);
        assert_eq!(b.onward_flight_id, 2);
        assert_eq!(b.inbound_arrival, at(11, 0));
        assert_eq!(b.onward_departure, at(10, 30));
        assert_eq!(b.connection_minutes, -30);
        assert_eq!(b.passenger_name, "Amelia Earhart");
    }

    #[test]
    fn test_capture_and_restore() {
        let network = disrupted();
        let snapshot = Snapshot::capture(1, "after storm", &network, at(12, 0)).unwrap();
        assert_eq!(snapshot.flights.len(), network.flights().count());
        assert_eq!(snapshot.metrics.delayed_flights, 2);

        let mut clean = demo_network().unwrap();
        snapshot.restore_into(&mut clean).unwrap();
        assert_eq!(clean.flight(1).unwrap().delay_minutes, 90);
        assert_eq!(
            clean.booking(2).unwrap().status,
            BookingStatus::MissedConnection
        );
        assert_eq!(WorldMetrics::compute(&clean), snapshot.metrics);
    }

    #[test]
    fn test_json_round_trip() {
        let snapshot = Snapshot::capture(3, "baseline", &disrupted(), at(12, 0)).unwrap();
        let restored = Snapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
    }
}
